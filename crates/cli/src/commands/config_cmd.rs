//! `kitsmith config`: configuration management commands.

use kitsmith_config::AppConfig;

use super::Context;

pub fn validate(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}", ctx.config_file().display());

    let config = ctx.load_config()?;
    println!("   Config parsed and validated");

    let mut warnings = Vec::new();
    let locations = &config.locations;
    let fixed = [
        ("supply", locations.supply),
        ("discard", locations.discard),
        ("destination", locations.destination),
        ("reference", locations.reference),
    ];
    for (i, (name, position)) in fixed.iter().enumerate() {
        if fixed[i + 1..].iter().any(|(_, other)| other == position) {
            warnings.push(format!("locations.{name} shares its position with another location"));
        }
    }
    if config.discord.enabled && config.discord.token.is_none() {
        warnings.push("discord.enabled is set but no token (set KITSMITH_DISCORD_TOKEN)".into());
    }
    if config.discord.enabled && config.discord.allowed_users.is_empty() {
        warnings.push("discord.allowed_users is empty, every command will be ignored".into());
    }

    for w in &warnings {
        println!("   warning: {w}");
    }

    println!();
    println!("   Supply:       {}", locations.supply);
    println!("   Discard:      {}", locations.discard);
    println!("   Destination:  {}", locations.destination);
    println!("   Reference:    {}", locations.reference);
    println!("   Scan radius:  {}", config.scan.radius);
    println!("   Index:        {}", config.index_path().display());
    println!("   Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    Ok(())
}

pub fn show(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config = ctx.load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path(ctx: &Context) {
    println!("{}", ctx.config_file().display());
}

pub fn init(ctx: &Context, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = ctx.config_file();
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_a_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context {
            config_path: Some(dir.path().join("nested").join("config.toml")),
            world_path: None,
        };

        init(&ctx, false).unwrap();
        assert!(ctx.load_config().is_ok());
        assert!(init(&ctx, false).is_err());
        assert!(init(&ctx, true).is_ok());
    }
}
