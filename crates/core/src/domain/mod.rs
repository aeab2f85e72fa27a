pub mod history;
pub mod preferences;
pub mod product;
pub mod recommendation;
pub mod wishlist;
