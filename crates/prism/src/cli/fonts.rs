//! The `prism fonts` command: check the font registry.

use prism_core::{Config, FontRegistry};

/// Load the configured faces and list what each alias resolves to.
pub async fn execute(config: Config) -> anyhow::Result<()> {
    println!("Font directory: {}", config.font_dir().display());

    let registry = FontRegistry::load(&config)?;
    for alias in registry.aliases() {
        let face = registry.resolve(alias);
        println!("  {:<20} {} ({})", alias, face.family, face.weight);
    }
    println!("{} face(s) loaded", registry.face_count());
    Ok(())
}
