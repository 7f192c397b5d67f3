mod channel;

pub use channel::ChannelTree;
