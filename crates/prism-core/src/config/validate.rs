//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::pipeline::Color;

use super::Config;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.max_image_size_bytes == 0 {
            return Err(invalid("limits.max_image_size_bytes must be > 0"));
        }
        if limits.min_image_dimension == 0 {
            return Err(invalid("limits.min_image_dimension must be > 0"));
        }
        if limits.min_image_dimension > limits.max_image_dimension {
            return Err(invalid(
                "limits.min_image_dimension must not exceed limits.max_image_dimension",
            ));
        }
        if limits.max_layers == 0 {
            return Err(invalid("limits.max_layers must be > 0"));
        }
        if limits.max_pipeline_steps == 0 {
            return Err(invalid("limits.max_pipeline_steps must be > 0"));
        }
        if limits.timeout_ms == 0 {
            return Err(invalid("limits.timeout_ms must be > 0"));
        }

        let defaults = &self.defaults;
        if !(1..=100).contains(&defaults.quality) {
            return Err(invalid("defaults.quality must be between 1 and 100"));
        }
        if !(defaults.font_size.is_finite() && defaults.font_size > 0.0) {
            return Err(invalid("defaults.font_size must be > 0"));
        }
        if Color::parse(&defaults.color).is_none() {
            return Err(invalid(format!(
                "defaults.color '{}' is not a valid color",
                defaults.color
            )));
        }

        let template = &self.template;
        if template.width < limits.min_image_dimension
            || template.width > limits.max_image_dimension
            || template.height < limits.min_image_dimension
            || template.height > limits.max_image_dimension
        {
            return Err(invalid(
                "template.width and template.height must be within the dimension limits",
            ));
        }
        if template.gradient_colors.len() < 2 {
            return Err(invalid("template.gradient_colors needs two colors"));
        }
        for color in template
            .gradient_colors
            .iter()
            .chain([&template.title_color, &template.subtitle_color])
        {
            if Color::parse(color).is_none() {
                return Err(invalid(format!("template color '{color}' is not valid")));
            }
        }
        if template.logo_size == 0 {
            return Err(invalid("template.logo_size must be > 0"));
        }
        if !(1..=100).contains(&template.quality) {
            return Err(invalid("template.quality must be between 1 and 100"));
        }

        Ok(())
    }
}
