pub mod loader;
pub mod types;

pub use loader::{
    load_news_csv, load_prices_csv, read_csv_table, write_table_csv, NewsLoadOptions,
    PriceLoadOptions,
};
