//! Mock weather. Readings are derived from the city name, so the same city
//! always reports the same conditions.

use mcp_scaffold::{json_result, McpError, Server, ToolResult, TypedToolHandler};
use serde::{Deserialize, Serialize};

const CONDITIONS: &[&str] = &["sunny", "partly cloudy", "cloudy", "rainy", "windy", "snowy"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum Units {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    city: String,
    #[serde(default)]
    units: Option<Units>,
}

#[derive(Debug, Serialize)]
struct WeatherReport {
    city: String,
    temperature: f64,
    units: Units,
    condition: &'static str,
    humidity: u32,
}

pub fn register(srv: &mut Server) {
    srv.handle_tool(
        "get-weather",
        TypedToolHandler::new(|args: WeatherArgs| async move { handle_get_weather(args) }),
    );
}

fn handle_get_weather(args: WeatherArgs) -> Result<ToolResult, McpError> {
    let city = args.city.trim();
    if city.is_empty() {
        return Err(McpError::InvalidArguments("city must not be empty".into()));
    }
    json_result(&report_for(city, args.units.unwrap_or_default()))
}

fn report_for(city: &str, units: Units) -> WeatherReport {
    let seed = city
        .to_lowercase()
        .bytes()
        .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));

    let celsius = f64::from(seed % 45) - 10.0;
    let temperature = match units {
        Units::Celsius => celsius,
        Units::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
    };

    WeatherReport {
        city: city.to_string(),
        temperature,
        units,
        condition: CONDITIONS[(seed / 45) as usize % CONDITIONS.len()],
        humidity: 20 + (seed / 7) % 70,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_city_same_report() {
        let a = report_for("Lisbon", Units::Celsius);
        let b = report_for("lisbon", Units::Celsius);
        assert_eq!(a.temperature, b.temperature);
        assert_eq!(a.condition, b.condition);
        assert_eq!(a.humidity, b.humidity);
    }

    #[test]
    fn test_fahrenheit_conversion() {
        let c = report_for("Oslo", Units::Celsius);
        let f = report_for("Oslo", Units::Fahrenheit);
        assert!((f.temperature - (c.temperature * 1.8 + 32.0)).abs() < 1e-9);
        assert_eq!(f.units, Units::Fahrenheit);
    }

    #[test]
    fn test_readings_in_range() {
        for city in ["Tokyo", "Nairobi", "Reykjavik", "Lima"] {
            let r = report_for(city, Units::Celsius);
            assert!((-10.0..35.0).contains(&r.temperature));
            assert!((20..90).contains(&r.humidity));
        }
    }

    #[test]
    fn test_blank_city_rejected() {
        let err = handle_get_weather(WeatherArgs {
            city: "  ".into(),
            units: None,
        })
        .unwrap_err();
        assert!(matches!(err, McpError::InvalidArguments(_)));
    }
}
