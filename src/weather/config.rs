use serde::Deserialize;

/// Ответ OpenWeather `/data/2.5/weather` (только нужные поля).
#[derive(Clone, Debug, Deserialize)]
pub struct CurrentWeather {
    pub name: String,
    pub weather: Vec<WeatherCondition>,
    pub main: MainReadings,
    pub wind: Wind,
}

impl CurrentWeather {
    /// Основное описание погоды (первый элемент `weather`).
    pub fn description(&self) -> Option<&str> {
        self.weather.first().map(|condition| condition.description.as_str())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Wind {
    pub speed: f64,
}
