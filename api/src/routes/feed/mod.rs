pub mod feed_route;
