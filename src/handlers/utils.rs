use crate::weather::config::CurrentWeather;

pub const DAILY_FORECAST_HEADER: &str = "🌤️ Ваш щоденний прогноз погоди:";

/// Экранирование MarkdownV2
pub fn escape_markdown_v2(text: &str) -> String {
    let specials = ['_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\'];
    let mut out = String::with_capacity(text.len() * 2);

    for ch in text.chars() {
        if specials.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Округление до ближайшего целого, половина вверх: 20.5 -> 21, -2.5 -> -2
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Первая буква заглавная, остальное без изменений
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Сводка погоды для пользователя (MarkdownV2)
pub fn format_weather_message(weather: &CurrentWeather) -> String {
    let description = capitalize_first(weather.description().unwrap_or_default());
    let temp = round_half_up(weather.main.temp);
    let feels_like = round_half_up(weather.main.feels_like);
    let wind = round_half_up(weather.wind.speed);

    format!(
        "*Погода у місті {}*\n\
        {}\n\
        🌡️ _Температура:_ *{}°C* \\(відчувається як {}°C\\)\n\
        💨 _Швидкість вітру:_ {} м/с",
        escape_markdown_v2(&weather.name),
        escape_markdown_v2(&description),
        escape_markdown_v2(&temp.to_string()),
        escape_markdown_v2(&feels_like.to_string()),
        escape_markdown_v2(&wind.to_string()),
    )
}

/// Ежедневное сообщение планировщика
pub fn format_daily_forecast(weather: &CurrentWeather) -> String {
    format!("{}\n{}", escape_markdown_v2(DAILY_FORECAST_HEADER), format_weather_message(weather))
}
