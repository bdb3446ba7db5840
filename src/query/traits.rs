pub trait ExternalText {
    fn cleaned(&self) -> Self;

    fn clean(&self, value: &str) -> String {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
