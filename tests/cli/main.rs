#[path = "../utils/mod.rs"]
mod utils;

mod generate;
mod licenses_xml;
