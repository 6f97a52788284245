fn main() {
    if let Err(err) = focus_timer_lib::run() {
        eprintln!("focus-timer: {err:#}");
        std::process::exit(1);
    }
}
