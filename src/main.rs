fn main() {
    simple_web_server::run();
}
