use vm_domain::config::Config;

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when at least one issue was found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    for issue in &issues {
        println!("{issue}");
    }
    println!("\n{} error(s) in {config_path}", issues.len());

    false
}

/// Dump the resolved config (with all defaults filled in) as TOML.
///
/// An inline API key is masked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = render(config)?;
    print!("{output}");
    Ok(())
}

fn render(config: &Config) -> anyhow::Result<String> {
    let mut redacted = config.clone();
    if let Some(key) = redacted.provider.auth.key.as_mut() {
        *key = mask(key);
    }
    toml::to_string_pretty(&redacted).map_err(|e| anyhow::anyhow!("serializing config: {e}"))
}

fn mask(secret: &str) -> String {
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 8 {
        "****".into()
    } else {
        format!("****{tail}")
    }
}
