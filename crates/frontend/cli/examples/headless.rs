use emu_core::System;
use std::env;
use std::fs;

/// Minimal driver: boot a BIOS for one frame and dump the save-state.
fn main() {
    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: headless <bios.bin>");
            std::process::exit(1);
        }
    };

    let bios = fs::read(&path).expect("cannot read BIOS image");
    let mut sys = emu_psx::PsxSystem::new();
    sys.mount("BIOS", &bios).expect("invalid BIOS image");

    let frame = sys.step_frame().expect("emulation fault");
    println!("Headless PSX frame: {}x{}", frame.width, frame.height);
    print!("{}", sys.take_tty_output());
    println!(
        "Save-state: {}",
        serde_json::to_string_pretty(&sys.save_state()).unwrap()
    );
}
