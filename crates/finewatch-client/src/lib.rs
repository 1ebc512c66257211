pub mod fetcher;
pub mod poster;

#[cfg(test)]
mod test_server;

pub use fetcher::ReqwestFetcher;
pub use poster::XPoster;
