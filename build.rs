use std::path::Path;

const CONFIG_PATH: &str = "configs/default_analysis.json";

fn main() {
    validate_config_file(Path::new(CONFIG_PATH));
    set_build_dependencies();
}

fn validate_config_file(config_path: &Path) {
    // Ensure config exists at build time
    assert!(
        config_path.exists(),
        "\n\nCONFIG BUILD ERROR: File not found\n\
         Path: {}\n\
         Please create the default analysis config before building.\n",
        config_path.display()
    );

    let contents = std::fs::read_to_string(config_path).unwrap_or_else(|e| {
        panic!(
            "\n\nCONFIG BUILD ERROR: Failed to read file\n\
             Path: {}\n\
             Error: {e}\n",
            config_path.display()
        );
    });

    let config: serde_json::Value = serde_json::from_str(&contents).unwrap_or_else(|e| {
        panic!(
            "\n\nCONFIG BUILD ERROR: Invalid JSON\n\
             Path: {}\n\
             Error: {e}\n\
             Hint: Check for missing commas, brackets, or invalid syntax.\n",
            config_path.display()
        );
    });

    validate_config_structure(&config);
}

fn validate_config_structure(config: &serde_json::Value) {
    assert!(
        config.is_object(),
        "\n\nCONFIG BUILD ERROR: Root must be a JSON object\n\
         Got: {config}\n"
    );

    let version = config
        .get("version")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_else(|| {
            panic!(
                "\n\nCONFIG BUILD ERROR: Missing 'version' field\n\
                 The config must have a top-level 'version' string.\n"
            );
        });

    let tau = config
        .get("comparison_tau")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    assert!(
        !tau.trim().is_empty(),
        "\n\nCONFIG BUILD ERROR: 'comparison_tau' must be a non-empty string\n"
    );

    let dr_max = validate_matching(config);

    println!("cargo:warning=Validated default config v{version}: taus from {tau}, dR <= {dr_max}");
}

fn validate_matching(config: &serde_json::Value) -> f64 {
    let Some(matching) = config.get("matching") else {
        // Falls back to the built-in default radius
        return 0.5;
    };

    let dr_max = matching
        .get("dr_max")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or_else(|| {
            panic!(
                "\n\nCONFIG BUILD ERROR: 'matching.dr_max' must be a number\n\
                 Got: {matching}\n"
            );
        });

    assert!(
        dr_max.is_finite() && dr_max >= 0.0,
        "\n\nCONFIG BUILD ERROR: 'matching.dr_max' must be finite and non-negative\n\
         Got: {dr_max}\n"
    );

    dr_max
}

fn set_build_dependencies() {
    // Tell cargo to rerun if the config changes
    println!("cargo:rerun-if-changed={CONFIG_PATH}");

    // Tell cargo to rerun if build.rs changes
    println!("cargo:rerun-if-changed=build.rs");
}
