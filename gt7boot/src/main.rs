fn main() {
    std::process::exit(gt7boot::run_cli());
}
