// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Writes the CustomResourceDefinitions of `DNSRecord`, `DNSProvider` and
//! `DNSGenerator` to `deploy/crds/`, straight from the types in `src/crd.rs`.
//!
//! Usage:
//!   cargo run --bin crdgen [output-dir]

use dns_manager::crd::{DNSGenerator, DNSProvider, DNSRecord};
use kube::CustomResourceExt;
use std::fs;
use std::path::{Path, PathBuf};

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("deploy/crds"), PathBuf::from);

    fs::create_dir_all(&output_dir)?;

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<DNSRecord>("dnsrecords.crd.yaml", &output_dir)?;
    generate_crd::<DNSProvider>("dnsproviders.crd.yaml", &output_dir)?;
    generate_crd::<DNSGenerator>("dnsgenerators.crd.yaml", &output_dir)?;

    println!(
        "✓ Successfully generated CRD YAML files in {}",
        output_dir.display()
    );
    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f {}", output_dir.display());

    Ok(())
}

fn generate_crd<T>(filename: &str, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>>
where
    T: CustomResourceExt,
{
    let yaml = serde_yaml::to_string(&T::crd())?;
    let path = output_dir.join(filename);
    fs::write(&path, format!("{COPYRIGHT_HEADER}{yaml}"))?;

    println!("  ✓ Generated {}", path.display());
    Ok(())
}
