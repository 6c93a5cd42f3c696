//! Friend requests between users. Only friends can split bills with each other.

mod core;
mod friends_page;
mod requests;

pub use core::{
    accept_friend_request, are_friends, create_friendship_table, get_friendships,
    send_friend_request,
};
pub use friends_page::get_friends_page;
pub use requests::{accept_friend_request_endpoint, send_friend_request_endpoint};
