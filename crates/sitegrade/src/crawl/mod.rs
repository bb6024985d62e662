//! Site crawling: URL handling, robots.txt, sitemaps, politeness and the
//! budgeted crawl coordinator.

pub mod crawler;
pub mod rate_limiter;
pub mod robots;
pub mod sitemap;
pub mod urls;

pub use crawler::{crawl, CrawlMode, CrawlOutput};
pub use rate_limiter::RateLimiter;
pub use robots::{parse_robots, RobotsRules};
