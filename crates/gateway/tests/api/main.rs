mod air_quality;
mod climate;
mod helpers;
mod service;
