//! Brand and model suggestions for the search form.

pub const MAX_SUGGESTIONS: usize = 8;

static CATALOG: &[(&str, &[&str])] = &[
    ("Acura", &["ILX", "MDX", "RDX", "TLX"]),
    ("Audi", &["A3", "A4", "A6", "Q3", "Q5", "Q7"]),
    ("BMW", &["3 Series", "5 Series", "X1", "X3", "X5"]),
    ("Buick", &["Enclave", "Encore", "Envision"]),
    ("Cadillac", &["CT5", "Escalade", "XT4", "XT5"]),
    ("Chevrolet", &["Camaro", "Colorado", "Equinox", "Malibu", "Silverado 1500", "Tahoe", "Traverse"]),
    ("Chrysler", &["300", "Pacifica"]),
    ("Dodge", &["Challenger", "Charger", "Durango", "Grand Caravan"]),
    ("Ford", &["Bronco", "Edge", "Escape", "Explorer", "F-150", "Fusion", "Mustang", "Ranger"]),
    ("GMC", &["Acadia", "Canyon", "Sierra 1500", "Terrain", "Yukon"]),
    ("Honda", &["Accord", "Civic", "CR-V", "HR-V", "Odyssey", "Pilot", "Ridgeline"]),
    ("Hyundai", &["Elantra", "Kona", "Palisade", "Santa Fe", "Sonata", "Tucson"]),
    ("Infiniti", &["Q50", "QX50", "QX60"]),
    ("Jeep", &["Cherokee", "Compass", "Gladiator", "Grand Cherokee", "Wrangler"]),
    ("Kia", &["Forte", "Optima", "Sorento", "Soul", "Sportage", "Telluride"]),
    ("Lexus", &["ES", "GX", "IS", "NX", "RX"]),
    ("Mazda", &["CX-30", "CX-5", "CX-9", "Mazda3", "Mazda6", "MX-5 Miata"]),
    ("Mercedes-Benz", &["C-Class", "E-Class", "GLC", "GLE"]),
    ("Mitsubishi", &["Outlander", "Eclipse Cross", "Mirage"]),
    ("Nissan", &["Altima", "Frontier", "Maxima", "Murano", "Pathfinder", "Rogue", "Sentra"]),
    ("Ram", &["1500", "2500"]),
    ("Subaru", &["Ascent", "Crosstrek", "Forester", "Impreza", "Legacy", "Outback"]),
    ("Tesla", &["Model 3", "Model S", "Model X", "Model Y"]),
    ("Toyota", &["4Runner", "Camry", "Corolla", "Highlander", "Prius", "RAV4", "Sienna", "Tacoma", "Tundra"]),
    ("Volkswagen", &["Atlas", "Golf", "Jetta", "Passat", "Tiguan"]),
    ("Volvo", &["S60", "XC40", "XC60", "XC90"]),
];

fn starts_with_ci(candidate: &str, prefix: &str) -> bool {
    candidate
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Brands starting with `prefix`, in catalog order. An empty prefix lists
/// the first few brands.
pub fn suggest_brands(prefix: &str) -> Vec<&'static str> {
    let prefix = prefix.trim();
    CATALOG
        .iter()
        .map(|(brand, _)| *brand)
        .filter(|brand| starts_with_ci(brand, prefix))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Models of `brand` (matched case-insensitively) starting with `prefix`.
/// Unknown brands have no suggestions.
pub fn suggest_models(brand: &str, prefix: &str) -> Vec<&'static str> {
    let brand = brand.trim();
    let prefix = prefix.trim();
    CATALOG
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(brand))
        .map(|(_, models)| {
            models
                .iter()
                .copied()
                .filter(|model| starts_with_ci(model, prefix))
                .take(MAX_SUGGESTIONS)
                .collect()
        })
        .unwrap_or_default()
}

/// Every brand, for the search form's select list.
pub fn brands() -> Vec<&'static str> {
    CATALOG.iter().map(|(brand, _)| *brand).collect()
}
