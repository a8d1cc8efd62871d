fn main() {
    // Host builds (tests, simulation, fuzzing) need no ESP-IDF environment.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
