#![allow(non_snake_case)]
use RustedCollocation::Examples::collocation_examples::collocation_examples;

fn main() {
    let example = 0;
    if let Err(e) = collocation_examples(example) {
        eprintln!("example {} failed: {}", example, e);
    }
}
