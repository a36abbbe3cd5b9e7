pub mod click;
pub mod feed;
pub mod health;
pub mod index_products;
pub mod search;
pub mod suggest;
