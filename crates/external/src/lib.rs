pub mod error;
pub mod news;
pub mod pubsub;
pub mod weather;

pub use error::ExternalError;
pub use news::{news_source, MockNews, NewsApiClient, NewsSource};
pub use pubsub::PubSubPublisher;
pub use weather::{weather_source, MockWeather, OpenWeatherClient, WeatherSource};
