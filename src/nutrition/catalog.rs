//! Static nutrition reference data shared by the estimators, manual search and quick log.

use serde::Serialize;

/// Density and protein content of a food the reference estimator can "detect".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityRef {
    pub key: &'static str,
    /// g/cm3
    pub density: f64,
    pub protein_per_100g: f64,
}

pub const DENSITY_TABLE: &[DensityRef] = &[
    DensityRef { key: "blanc_poulet_cuit", density: 1.05, protein_per_100g: 31.0 },
    DensityRef { key: "steak_hache_5mg", density: 0.95, protein_per_100g: 25.0 },
    DensityRef { key: "oeuf_dur", density: 1.03, protein_per_100g: 13.0 },
    DensityRef { key: "riz_blanc_cuit", density: 0.85, protein_per_100g: 2.7 },
    DensityRef { key: "saumon_cuit", density: 1.01, protein_per_100g: 22.0 },
    DensityRef { key: "whey_shaker", density: 1.1, protein_per_100g: 80.0 },
];

/// A food the user can pick by name when scanning is not an option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualReference {
    pub name: &'static str,
    pub protein_per_100g: f64,
}

pub const MANUAL_REFERENCES: &[ManualReference] = &[
    ManualReference { name: "Blanc de Poulet", protein_per_100g: 31.0 },
    ManualReference { name: "Oeuf Dur", protein_per_100g: 13.0 },
    ManualReference { name: "Fromage Blanc 0%", protein_per_100g: 8.0 },
    ManualReference { name: "Steak Haché 5%", protein_per_100g: 25.0 },
    ManualReference { name: "Thon en conserve", protein_per_100g: 28.0 },
];

/// One-tap portion with a fixed protein amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuickPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub protein: f64,
    pub portion: &'static str,
}

pub const QUICK_PRESETS: &[QuickPreset] = &[
    QuickPreset { id: "poulet", name: "Poulet", protein: 30.0, portion: "150g" },
    QuickPreset { id: "oeufs", name: "Oeufs", protein: 18.0, portion: "3 pcs" },
    QuickPreset { id: "fromage", name: "F. Blanc", protein: 20.0, portion: "250g" },
    QuickPreset { id: "pates", name: "Pâtes", protein: 12.0, portion: "200g" },
    QuickPreset { id: "shake", name: "Whey", protein: 25.0, portion: "1 scoop" },
    QuickPreset { id: "snack", name: "Barre", protein: 20.0, portion: "1 barre" },
];

/// `blanc_poulet_cuit` -> `Blanc Poulet Cuit`
pub fn display_label(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn find_reference(name: &str) -> Option<&'static ManualReference> {
    let needle = name.trim().to_lowercase();
    MANUAL_REFERENCES
        .iter()
        .find(|r| r.name.to_lowercase() == needle)
}

pub fn search_references(query: &str) -> Vec<&'static ManualReference> {
    let q = query.trim().to_lowercase();
    MANUAL_REFERENCES
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&q))
        .collect()
}

pub fn find_preset(id: &str) -> Option<&'static QuickPreset> {
    QUICK_PRESETS.iter().find(|p| p.id == id.trim())
}
