pub mod action_dialog;
pub mod activity_feed;
pub mod composer;
pub mod media_thread;
pub mod thread_drawer;
