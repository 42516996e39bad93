use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::ViewError;
use crate::platform::models::object_key;
use crate::platform::{
    AuthProvider, ObjectStore, PendingImage, Platform, ProfileFields, ProfileUpdate, RecordStore,
    Session, User,
};
use crate::views::{LoadingFlag, ViewScope};

/// Account profile editor.
///
/// Avatar changes are a two-step protocol: [`upload_avatar`](Self::upload_avatar)
/// stores the image and points `avatar_url` at it in memory only, and a later
/// [`save`](Self::save) writes it to the profile row.
pub struct ProfileView {
    auth: Arc<dyn AuthProvider>,
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    bucket: String,
    fields: ProfileFields,
    image: Option<PendingImage>,
    loading: LoadingFlag,
    scope: ViewScope,
    loaded_for: Option<String>,
}

impl ProfileView {
    pub fn new(platform: Platform, bucket: impl Into<String>) -> Self {
        Self {
            auth: platform.auth,
            records: platform.records,
            objects: platform.objects,
            bucket: bucket.into(),
            fields: ProfileFields::default(),
            image: None,
            loading: LoadingFlag::default(),
            scope: ViewScope::new(),
            loaded_for: None,
        }
    }

    pub fn fields(&self) -> &ProfileFields {
        &self.fields
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.fields.username = Some(username.into());
    }

    pub fn set_full_name(&mut self, full_name: impl Into<String>) {
        self.fields.full_name = Some(full_name.into());
    }

    pub fn set_website(&mut self, website: impl Into<String>) {
        self.fields.website = Some(website.into());
    }

    /// Choose (or clear) the image for the next upload
    pub fn select_image(&mut self, image: Option<PendingImage>) {
        self.image = image;
    }

    pub fn pending_image(&self) -> Option<&PendingImage> {
        self.image.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_set()
    }

    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    /// Public URL of the current avatar. An empty `avatar_url` still yields a
    /// URL (pointing at the bucket root).
    pub fn avatar_src(&self) -> String {
        let path = self.fields.avatar_url.as_deref().unwrap_or_default();
        self.objects.public_url(&self.bucket, path)
    }

    /// End the view's scope; in-flight requests are abandoned and their
    /// results never applied.
    pub fn unmount(&self) {
        self.scope.end();
    }

    /// Load once per distinct session. Returns whether a load was run.
    pub async fn activate(&mut self, session: &Session) -> Result<bool, ViewError> {
        if self.loaded_for.as_deref() == Some(session.identity()) {
            return Ok(false);
        }
        self.loaded_for = Some(session.identity().to_string());
        self.load().await?;
        Ok(true)
    }

    async fn current_user(&self) -> Result<User, ViewError> {
        let session = self.scope.guard(self.auth.get_session()).await??;
        session.map(|s| s.user).ok_or(ViewError::Unauthenticated)
    }

    /// Fetch the signed-in user's profile into the form.
    ///
    /// A missing row leaves the fields untouched and is not an error.
    pub async fn load(&mut self) -> Result<(), ViewError> {
        let _loading = self.loading.raise();
        let user = self.current_user().await?;

        let fetched = self.scope.guard(self.records.fetch_profile(user.id)).await?;
        match fetched {
            Ok(fields) => self.fields = fields,
            Err(err) if err.is_no_rows() => {
                debug!(user_id = %user.id, "no profile row yet");
            }
            Err(err) => return Err(err.into()),
        }

        Ok(())
    }

    /// Upsert the form's current values for the signed-in user.
    /// The key always comes from the session, never from form state.
    pub async fn save(&mut self) -> Result<(), ViewError> {
        let _loading = self.loading.raise();
        let user = self.current_user().await?;

        let update = ProfileUpdate::new(user.id, &self.fields, Utc::now());
        self.scope
            .guard(self.records.upsert_profile(&update))
            .await??;

        Ok(())
    }

    /// Upload the selected image and point `avatar_url` at it (in memory only).
    ///
    /// Returns the stored path, or `None` when no image was selected. The
    /// selection is consumed by the attempt whatever its outcome.
    pub async fn upload_avatar(&mut self) -> Result<Option<String>, ViewError> {
        let Some(image) = self.image.take() else {
            return Ok(None);
        };

        let key = object_key(Utc::now(), &image.file_name);
        let uploaded = self
            .scope
            .guard(self.objects.upload(&self.bucket, &key, &image))
            .await?;

        match uploaded {
            Ok(stored) => {
                debug!(path = %stored.path, "avatar uploaded");
                self.fields.avatar_url = Some(stored.path.clone());
                Ok(Some(stored.path))
            }
            Err(err) => {
                warn!(error = %err, key = %key, "avatar upload failed");
                Err(err.into())
            }
        }
    }

    /// End the session. Local state is left alone; the host reacts to the
    /// session going away.
    pub async fn sign_out(&self) -> Result<(), ViewError> {
        self.scope.guard(self.auth.sign_out()).await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::testing::{Call, FakePlatform, PUBLIC_BASE};

    fn record() -> ProfileFields {
        ProfileFields {
            username: Some("a".into()),
            full_name: Some("b".into()),
            website: Some("c".into()),
            avatar_url: Some("d".into()),
        }
    }

    fn view(fake: &FakePlatform) -> ProfileView {
        ProfileView::new(fake.platform(), "avatars")
    }

    #[tokio::test]
    async fn load_without_session_never_fetches() {
        let fake = FakePlatform::new();
        let mut view = view(&fake);

        let err = view.load().await.unwrap_err();

        assert!(matches!(err, ViewError::Unauthenticated));
        assert_eq!(fake.calls(), vec![Call::GetSession]);
        assert!(!view.is_loading());
    }

    #[tokio::test]
    async fn load_missing_row_is_not_an_error() {
        let (fake, _session) = FakePlatform::signed_in();
        let mut view = view(&fake);

        view.load().await.unwrap();

        assert_eq!(view.fields(), &ProfileFields::default());
        assert!(!view.is_loading());
    }

    #[tokio::test]
    async fn load_populates_exactly_the_four_fields() {
        let (fake, session) = FakePlatform::signed_in();
        fake.insert_row(session.user.id, record());
        let mut view = view(&fake);
        let image = PendingImage::new("me.png", vec![1, 2, 3]);
        view.select_image(Some(image.clone()));

        view.load().await.unwrap();

        assert_eq!(view.fields(), &record());
        assert_eq!(view.pending_image(), Some(&image));
        assert_eq!(
            fake.calls(),
            vec![Call::GetSession, Call::FetchProfile(session.user.id)]
        );
    }

    #[tokio::test]
    async fn load_surfaces_other_errors() {
        let (fake, session) = FakePlatform::signed_in();
        let mut view = view(&fake);
        view.set_username("kept");
        fake.fail_when(|call| matches!(call, Call::FetchProfile(_)), 500, "boom");

        let err = view.load().await.unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert!(matches!(err, ViewError::Service(PlatformError::Api { status: 500, .. })));
        assert_eq!(fake.calls(), vec![Call::GetSession, Call::FetchProfile(session.user.id)]);
        assert_eq!(view.fields().username.as_deref(), Some("kept"));
        assert!(!view.is_loading());
    }

    #[tokio::test]
    async fn save_keys_on_session_user() {
        let (fake, session) = FakePlatform::signed_in();
        let mut view = view(&fake);
        view.set_username("neo");
        view.set_full_name("Thomas Anderson");
        view.set_website("https://example.com");

        let before = Utc::now();
        view.save().await.unwrap();

        let upserts = fake.upserts();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].user_id, session.user.id);
        assert_eq!(upserts[0].username.as_deref(), Some("neo"));
        assert_eq!(upserts[0].avatar_url, None);
        assert!(upserts[0].updated_at >= before);
        assert_eq!(fake.row(session.user.id).unwrap().full_name.as_deref(), Some("Thomas Anderson"));
    }

    #[tokio::test]
    async fn save_follows_whoever_is_signed_in() {
        let (fake, first) = FakePlatform::signed_in();
        fake.insert_row(first.user.id, record());
        let mut view = view(&fake);
        view.load().await.unwrap();

        let second = crate::testing::sample_session();
        fake.set_session(Some(second.clone()));
        view.save().await.unwrap();

        assert_eq!(fake.upserts()[0].user_id, second.user.id);
        assert_eq!(fake.row(first.user.id), Some(record()));
    }

    #[tokio::test]
    async fn save_without_session() {
        let fake = FakePlatform::new();
        let mut view = view(&fake);

        assert!(matches!(view.save().await, Err(ViewError::Unauthenticated)));
        assert!(fake.upserts().is_empty());
    }

    #[tokio::test]
    async fn upload_then_save_persists_avatar() {
        let (fake, session) = FakePlatform::signed_in();
        fake.insert_row(session.user.id, record());
        let mut view = view(&fake);
        view.load().await.unwrap();

        view.select_image(Some(PendingImage::new("me.png", vec![9, 9])));
        let path = view.upload_avatar().await.unwrap().unwrap();

        assert!(path.ends_with("_me.png"));
        assert_eq!(view.fields().avatar_url.as_deref(), Some(path.as_str()));
        assert!(view.pending_image().is_none());
        assert_eq!(fake.object(&format!("avatars/{path}")), Some(vec![9, 9]));
        // Not durable yet
        assert_eq!(fake.row(session.user.id).unwrap().avatar_url.as_deref(), Some("d"));

        view.save().await.unwrap();
        assert_eq!(
            fake.row(session.user.id).unwrap().avatar_url.as_deref(),
            Some(path.as_str())
        );
    }

    #[tokio::test]
    async fn upload_without_selection_is_a_no_op() {
        let (fake, _session) = FakePlatform::signed_in();
        let mut view = view(&fake);
        let before = view.fields().clone();

        assert_eq!(view.upload_avatar().await.unwrap(), None);
        assert!(fake.calls().is_empty());
        assert_eq!(view.fields(), &before);
    }

    #[tokio::test]
    async fn failed_upload_is_reported_and_discards_selection() {
        let (fake, _session) = FakePlatform::signed_in();
        let mut view = view(&fake);
        view.select_image(Some(PendingImage::new("me.png", vec![1])));
        fake.fail_with(413, "Payload too large");

        let err = view.upload_avatar().await.unwrap_err();

        assert_eq!(err.to_string(), "Payload too large");
        assert!(view.pending_image().is_none());
        assert_eq!(view.fields().avatar_url, None);
    }

    #[tokio::test]
    async fn loading_flag_set_only_while_in_flight() {
        let (fake, session) = FakePlatform::signed_in();
        fake.insert_row(session.user.id, record());
        let mut view = view(&fake);
        fake.watch(view.loading_flag());

        assert!(!view.is_loading());
        view.load().await.unwrap();
        assert!(!view.is_loading());
        view.save().await.unwrap();
        assert!(!view.is_loading());

        fake.fail_with(500, "down");
        assert!(view.save().await.is_err());
        assert!(!view.is_loading());

        assert!(fake.flag_seen().iter().all(|seen| *seen));
        assert_eq!(fake.flag_seen().len(), 5);
    }

    #[tokio::test]
    async fn activate_loads_once_per_session() {
        let (fake, session) = FakePlatform::signed_in();
        let mut view = view(&fake);

        assert!(view.activate(&session).await.unwrap());
        assert!(!view.activate(&session).await.unwrap());

        let next = Session {
            access_token: "rotated".into(),
            ..session.clone()
        };
        assert!(view.activate(&next).await.unwrap());

        let fetches = fake
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::FetchProfile(_)))
            .count();
        assert_eq!(fetches, 2);
    }

    #[tokio::test]
    async fn avatar_src_has_no_empty_guard() {
        let fake = FakePlatform::new();
        let mut view = view(&fake);

        assert_eq!(view.avatar_src(), format!("{PUBLIC_BASE}/avatars/"));

        view.fields.avatar_url = Some("1_me.png".into());
        assert_eq!(view.avatar_src(), format!("{PUBLIC_BASE}/avatars/1_me.png"));
    }

    #[tokio::test]
    async fn sign_out_leaves_form_state() {
        let (fake, session) = FakePlatform::signed_in();
        fake.insert_row(session.user.id, record());
        let mut view = view(&fake);
        view.load().await.unwrap();

        view.sign_out().await.unwrap();

        assert_eq!(view.fields(), &record());
        assert!(fake.calls().contains(&Call::SignOut));
        assert!(matches!(view.load().await, Err(ViewError::Unauthenticated)));
    }

    #[tokio::test]
    async fn unmounted_view_applies_nothing() {
        let (fake, session) = FakePlatform::signed_in();
        fake.insert_row(session.user.id, record());
        let mut view = view(&fake);
        view.unmount();

        assert!(matches!(view.load().await, Err(ViewError::Cancelled)));
        assert_eq!(view.fields(), &ProfileFields::default());
        assert!(!view.is_loading());
    }
}
