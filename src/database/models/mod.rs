pub mod comment;
pub mod like;
pub mod playlist;
pub mod subscription;
pub mod tweet;
pub mod user;
pub mod video;

pub use comment::{Comment, NewComment};
pub use like::{Like, LikeTarget, NewLike};
pub use playlist::{NewPlaylist, Playlist};
pub use subscription::{NewSubscription, Subscription};
pub use tweet::{NewTweet, Tweet};
pub use user::{NewUser, User};
pub use video::{NewVideo, Video};
