fn main() {
    std::process::exit(stackit::cli::run());
}
