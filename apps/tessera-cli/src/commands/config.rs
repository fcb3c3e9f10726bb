use tessera_config::CliConfig;

pub fn cmd_config_show() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::load_or_default()?;
    println!("Config:   {}", CliConfig::default_path()?.display());
    println!(
        "Database: {}",
        config.database_url.as_deref().unwrap_or("(default store)")
    );
    println!(
        "Actor:    {}",
        config.actor_email.as_deref().unwrap_or("(not set)")
    );
    Ok(())
}

pub fn cmd_config_set_actor(email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::load_or_default()?;
    config.actor_email = Some(email.to_string());
    config.save()?;
    println!("Acting user set to {}", email);
    Ok(())
}

pub fn cmd_config_set_database(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::load_or_default()?;
    config.database_url = Some(url.to_string());
    config.save()?;
    println!("Database set to {}", url);
    Ok(())
}
