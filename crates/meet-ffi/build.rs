fn main() {
    if let Err(e) = uniffi::generate_scaffolding("src/meet.udl") {
        panic!("failed to generate UniFFI scaffolding: {e}");
    }
}
