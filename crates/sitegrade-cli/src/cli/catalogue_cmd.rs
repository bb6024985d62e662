//! `sitegrade catalogue`: list every metric the engine evaluates.

use crate::cli::output::{self, Styled};
use anyhow::Result;
use sitegrade::model::Category;
use sitegrade::{catalogue_export, CATALOGUE};

pub fn run() -> Result<()> {
    if output::is_json() {
        return output::print_json(&catalogue_export());
    }

    let s = Styled::new();
    output::print_header(&s);
    println!(
        "  {} metrics, catalogue {}",
        CATALOGUE.len(),
        sitegrade::CATALOGUE_VERSION
    );

    for category in Category::ALL {
        println!();
        output::print_section(&s, category.label());
        for d in CATALOGUE.iter().filter(|d| d.category == category) {
            let provider = match d.provider {
                Some(p) => s.dim(&format!("via {p:?}")),
                None => String::new(),
            };
            println!("    {:>3}  {:<30} weight {:<4} {provider}", d.id.0, d.name, d.weight);
        }
    }
    Ok(())
}
