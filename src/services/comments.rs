use tracing::info;
use uuid::Uuid;

use super::{ensure_owner, parse_id, required, Page, PageRequest, PaginatedQueryService, ServiceError, ServiceResult};
use crate::app::AppState;
use crate::config::PaginationConfig;
use crate::database::models::{Comment, NewComment, Video};
use crate::database::{Repository, Update};
use crate::filter::Filter;

pub struct CommentService {
    comments: Repository<Comment>,
    videos: Repository<Video>,
    pages: PaginatedQueryService,
    pagination: PaginationConfig,
}

impl CommentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            comments: Repository::new(state.store.clone()),
            videos: Repository::new(state.store.clone()),
            pages: PaginatedQueryService::new(state.store.clone()),
            pagination: state.config.pagination.clone(),
        }
    }

    /// Comments on a video, oldest first
    pub async fn list_for_video(
        &self,
        video_id: &str,
        page: Option<&str>,
        limit: Option<&str>,
    ) -> ServiceResult<Page<Comment>> {
        let video = parse_id(video_id, "videoId")?;
        let request = PageRequest::from_raw(page, limit, &self.pagination);
        self.ensure_video(video).await?;

        let filter = Filter::eq("video", video.to_string());
        Ok(self.pages.query(&filter, vec![], request).await?)
    }

    pub async fn add(&self, owner: Uuid, video_id: &str, content: Option<&str>) -> ServiceResult<Comment> {
        let video = parse_id(video_id, "videoId")?;
        let content = required(content, "content")?;
        self.ensure_video(video).await?;

        let comment = self.comments.create(&NewComment { content, video, owner }).await?;
        info!("User {} commented {} on video {}", owner, comment.id, video);
        Ok(comment)
    }

    pub async fn update(&self, requester: Uuid, comment_id: &str, content: Option<&str>) -> ServiceResult<Comment> {
        let id = parse_id(comment_id, "commentId")?;
        let comment = self.find(id).await?;
        ensure_owner(comment.owner, requester, "update this comment")?;
        let content = required(content, "content")?;

        self.comments
            .update(id, &Update::set("content", content))
            .await?
            .ok_or_else(|| ServiceError::not_found("Comment not found"))
    }

    pub async fn delete(&self, requester: Uuid, comment_id: &str) -> ServiceResult<()> {
        let id = parse_id(comment_id, "commentId")?;
        let comment = self.find(id).await?;
        ensure_owner(comment.owner, requester, "delete this comment")?;

        self.comments.delete(id).await?;
        info!("User {} deleted comment {}", requester, id);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> ServiceResult<Comment> {
        self.comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Comment not found"))
    }

    async fn ensure_video(&self, id: Uuid) -> ServiceResult<()> {
        if !self.videos.exists(id).await? {
            return Err(ServiceError::not_found("Video not found"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewVideo;
    use crate::services::test_support::state;

    async fn video(state: &AppState, owner: Uuid) -> Video {
        Repository::<Video>::new(state.store.clone())
            .create(&NewVideo {
                video_file: "http://localhost:8000/media/v.mp4".into(),
                thumbnail: "http://localhost:8000/media/t.png".into(),
                title: "clip".into(),
                description: "d".into(),
                duration: 12.5,
                views: 0,
                is_published: true,
                owner,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn comments_page_per_video() {
        let (state, _dir) = state();
        let service = CommentService::new(&state);
        let user = Uuid::new_v4();
        let (v1, v2) = (video(&state, user).await, video(&state, user).await);

        for i in 0..12 {
            service.add(user, &v1.id.to_string(), Some(&format!("c{}", i))).await.unwrap();
        }
        service.add(user, &v2.id.to_string(), Some("elsewhere")).await.unwrap();

        let page = service.list_for_video(&v1.id.to_string(), Some("2"), Some("5")).await.unwrap();
        assert_eq!(page.total_items, 12);
        assert_eq!(page.total_pages, 3);
        let contents: Vec<_> = page.items.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["c5", "c6", "c7", "c8", "c9"]);

        let missing = service.list_for_video(&Uuid::new_v4().to_string(), None, None).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn add_validates_content_and_video() {
        let (state, _dir) = state();
        let service = CommentService::new(&state);
        let user = Uuid::new_v4();
        let v = video(&state, user).await;

        assert!(matches!(service.add(user, &v.id.to_string(), None).await, Err(ServiceError::Validation(_))));
        assert!(matches!(
            service.add(user, &Uuid::new_v4().to_string(), Some("hi")).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(service.add(user, "bad", Some("hi")).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn owner_only_edits() {
        let (state, _dir) = state();
        let service = CommentService::new(&state);
        let (author, other) = (Uuid::new_v4(), Uuid::new_v4());
        let v = video(&state, author).await;
        let comment = service.add(author, &v.id.to_string(), Some("first!")).await.unwrap();
        let id = comment.id.to_string();

        assert!(matches!(service.update(other, &id, Some("x")).await, Err(ServiceError::Authorization(_))));
        assert!(matches!(service.delete(other, &id).await, Err(ServiceError::Authorization(_))));

        assert_eq!(service.update(author, &id, Some("edited")).await.unwrap().content, "edited");
        service.delete(author, &id).await.unwrap();
        assert!(matches!(service.update(author, &id, Some("x")).await, Err(ServiceError::NotFound(_))));
    }
}
