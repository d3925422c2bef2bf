//! Agent profiles: system instructions plus the tools they may use.

use runtime::tools::{SchemaError, Tool, ToolRegistry};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::weather::WeatherTable;
use crate::{Error, real_estate, weather};

const WEATHER_INSTRUCTIONS: &str = "You are a helpful weather assistant. You can provide weather \
information for specific cities. Use the get_weather tool to fetch weather data for a city, and \
the list_cities tool to show available cities.";

const REAL_ESTATE_INSTRUCTIONS: &str = "You are an expert real estate market analyst with deep \
knowledge of property markets, pricing trends, and neighborhood analysis. You help users with:

- Searching for properties based on their criteria
- Analyzing market trends and providing insights
- Calculating mortgage payments and affordability
- Providing detailed neighborhood information
- Comparing properties to help make informed decisions

Always provide detailed, data-driven insights and practical recommendations. When users ask about \
specific locations or properties, use the available tools to gather accurate information. Be \
friendly, professional, and focus on helping users make informed real estate decisions.";

const ALL_INSTRUCTIONS: &str = "You are a helpful concierge. Answer weather questions with the \
weather tools and real estate questions with the property, market, mortgage, neighborhood and \
comparison tools. Prefer tool results over guesses.";

/// Which agent to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    Weather,
    RealEstate,
    #[default]
    All,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Weather, Profile::RealEstate, Profile::All];

    pub fn name(self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::RealEstate => "real-estate",
            Self::All => "all",
        }
    }

    /// System prompt for the remote agent.
    pub fn instructions(self) -> &'static str {
        match self {
            Self::Weather => WEATHER_INSTRUCTIONS,
            Self::RealEstate => REAL_ESTATE_INSTRUCTIONS,
            Self::All => ALL_INSTRUCTIONS,
        }
    }

    /// The tools this profile exposes, in registration order.
    pub fn tools(self) -> Result<Vec<Arc<dyn Tool>>, SchemaError> {
        let table = Arc::new(WeatherTable::standard());
        Ok(match self {
            Self::Weather => weather::tools(table)?,
            Self::RealEstate => real_estate::tools()?,
            Self::All => {
                let mut tools = weather::tools(table)?;
                tools.extend(real_estate::tools()?);
                tools
            }
        })
    }

    /// Build the registry for this profile.
    pub fn registry(self) -> Result<ToolRegistry, SchemaError> {
        let mut registry = ToolRegistry::new();
        for tool in self.tools()? {
            registry.register_arc(tool);
        }
        info!(profile = self.name(), tools = registry.len(), "registry built");
        Ok(registry)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownProfile(s.to_string()))
    }
}
