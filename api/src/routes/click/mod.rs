pub mod click_route;
