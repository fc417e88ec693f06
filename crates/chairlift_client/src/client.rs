//! Endpoint-level facade over the upstream conference-management API.
//!
//! Mirrors the upstream surface (events, submissions, talks, speakers,
//! reviews, rooms, questions, answers, tags, submission types, tracks,
//! `me`) and reconstructs the nested entity view that newer wire
//! versions replace with identifier references.

use crate::cache::{CacheKind, ExpansionCache};
use crate::error::{Result, UpstreamError};
use crate::fetch::{Fetcher, Paginated, QueryParams};
use chairlift_protocol::defaults;
use chairlift_protocol::types::{
    Answer, AnswerId, Event, EventSlug, Me, Proposal, ProposalCode, Question, QuestionId, Review,
    Room, RoomId, Speaker, SpeakerCode, SubmissionType, SubmissionTypeId, Tag, Track, TrackId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Client for one upstream instance. Cloning shares the fetcher's
/// throttle, the expansion cache, and the recorded alias state.
#[derive(Clone)]
pub struct UpstreamClient {
    fetcher: Fetcher,
    cache: Arc<ExpansionCache>,
    lenient: bool,
    talks_alias_active: Arc<AtomicBool>,
}

impl UpstreamClient {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            cache: Arc::new(ExpansionCache::default()),
            lenient: false,
            talks_alias_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cache(mut self, cache: Arc<ExpansionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Lenient mode drops malformed list elements instead of
    /// terminating the sequence.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn cache(&self) -> &Arc<ExpansionCache> {
        &self.cache
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Whether a `talks` request has fallen back to `submissions`.
    pub fn talks_alias_recorded(&self) -> bool {
        self.talks_alias_active.load(Ordering::SeqCst)
    }

    fn event_path(event: &EventSlug, resource: &str) -> String {
        format!("/api/events/{event}/{resource}/")
    }

    fn detail_path(event: &EventSlug, resource: &str, key: &str) -> String {
        format!("/api/events/{event}/{resource}/{key}/")
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<T>)> {
        let (count, sequence) = self.fetcher.fetch_list(path, params).await?;
        let sequence = if self.lenient {
            sequence.lenient()
        } else {
            sequence
        };
        Ok((count, sequence))
    }

    // ========================================================================
    // Events & profile
    // ========================================================================

    pub async fn events(&self, params: &QueryParams) -> Result<(u64, Paginated<Event>)> {
        self.list("/api/events/", params).await
    }

    pub async fn event(&self, slug: &EventSlug) -> Result<Event> {
        let path = format!("/api/events/{slug}/");
        self.fetcher.fetch_detail(&path, &QueryParams::new()).await
    }

    pub async fn me(&self) -> Result<Me> {
        self.fetcher
            .fetch_detail("/api/me/", &QueryParams::new())
            .await
    }

    // ========================================================================
    // Proposals
    // ========================================================================

    /// List submissions. Elements arrive in upstream order with
    /// references expanded transparently.
    pub async fn submissions(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, ProposalStream)> {
        self.maybe_prepopulate(event, params).await?;
        let path = Self::event_path(event, "submissions");
        let (count, inner) = self.list::<Proposal>(&path, params).await?;
        Ok((count, ProposalStream::new(self.clone(), event.clone(), inner)))
    }

    /// The historical `talks` alias: accepted/confirmed submissions.
    /// Falls back to `submissions` with an equivalent filter when the
    /// alias 404s, and records the fallback.
    pub async fn talks(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, ProposalStream)> {
        self.maybe_prepopulate(event, params).await?;
        let path = Self::event_path(event, "talks");
        match self.list::<Proposal>(&path, params).await {
            Ok((count, inner)) => {
                Ok((count, ProposalStream::new(self.clone(), event.clone(), inner)))
            }
            Err(error) if error.is_not_found() => {
                self.talks_alias_active.store(true, Ordering::SeqCst);
                tracing::info!(
                    event = %event,
                    "talks endpoint missing; falling back to filtered submissions"
                );
                let filtered = params
                    .clone()
                    .state("accepted")
                    .state("confirmed");
                let path = Self::event_path(event, "submissions");
                let (count, inner) = self.list::<Proposal>(&path, &filtered).await?;
                Ok((count, ProposalStream::new(self.clone(), event.clone(), inner)))
            }
            Err(error) => Err(error),
        }
    }

    pub async fn submission(&self, event: &EventSlug, code: &ProposalCode) -> Result<Proposal> {
        let path = Self::detail_path(event, "submissions", code.as_str());
        let mut proposal: Proposal = self.fetcher.fetch_detail(&path, &QueryParams::new()).await?;
        self.expand_proposal(event, &mut proposal).await?;
        Ok(proposal)
    }

    // ========================================================================
    // Speakers
    // ========================================================================

    pub async fn speakers(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<Speaker>)> {
        self.list(&Self::event_path(event, "speakers"), params).await
    }

    pub async fn speaker(&self, event: &EventSlug, code: &SpeakerCode) -> Result<Speaker> {
        let path = Self::detail_path(event, "speakers", code.as_str());
        let mut speaker: Speaker = self.fetcher.fetch_detail(&path, &QueryParams::new()).await?;
        self.expand_speaker(event, &mut speaker).await?;
        Ok(speaker)
    }

    // ========================================================================
    // Reviews, rooms, questions, answers, tags
    // ========================================================================

    /// Requires privileged credentials on the upstream.
    pub async fn reviews(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<Review>)> {
        self.list(&Self::event_path(event, "reviews"), params).await
    }

    pub async fn rooms(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<Room>)> {
        self.list(&Self::event_path(event, "rooms"), params).await
    }

    pub async fn room(&self, event: &EventSlug, id: RoomId) -> Result<Room> {
        let path = Self::detail_path(event, "rooms", &id.to_string());
        let room: Room = self.fetcher.fetch_detail(&path, &QueryParams::new()).await?;
        self.cache.put_room(room.clone()).await;
        Ok(room)
    }

    pub async fn questions(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<Question>)> {
        self.list(&Self::event_path(event, "questions"), params).await
    }

    pub async fn question(&self, event: &EventSlug, id: QuestionId) -> Result<Question> {
        if let Some(question) = self.cache.get_question(id).await {
            return Ok(question);
        }
        let path = Self::detail_path(event, "questions", &id.to_string());
        let question: Question = self.fetcher.fetch_detail(&path, &QueryParams::new()).await?;
        self.cache.put_question(question.clone()).await;
        Ok(question)
    }

    /// Requires privileged credentials on the upstream.
    pub async fn answers(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<Answer>)> {
        self.list(&Self::event_path(event, "answers"), params).await
    }

    pub async fn tags(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<Tag>)> {
        self.list(&Self::event_path(event, "tags"), params).await
    }

    // ========================================================================
    // Taxonomy
    // ========================================================================

    pub async fn tracks(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<Track>)> {
        self.list(&Self::event_path(event, "tracks"), params).await
    }

    pub async fn track(&self, event: &EventSlug, id: TrackId) -> Result<Track> {
        if let Some(track) = self.cache.get_track(id).await {
            return Ok(track);
        }
        let path = Self::detail_path(event, "tracks", &id.to_string());
        let track: Track = self.fetcher.fetch_detail(&path, &QueryParams::new()).await?;
        self.cache.put_track(track.clone()).await;
        Ok(track)
    }

    pub async fn submission_types(
        &self,
        event: &EventSlug,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<SubmissionType>)> {
        self.list(&Self::event_path(event, "submission-types"), params)
            .await
    }

    pub async fn submission_type(
        &self,
        event: &EventSlug,
        id: SubmissionTypeId,
    ) -> Result<SubmissionType> {
        if let Some(submission_type) = self.cache.get_submission_type(id).await {
            return Ok(submission_type);
        }
        let path = Self::detail_path(event, "submission-types", &id.to_string());
        let submission_type: SubmissionType =
            self.fetcher.fetch_detail(&path, &QueryParams::new()).await?;
        self.cache.put_submission_type(submission_type.clone()).await;
        Ok(submission_type)
    }

    // ========================================================================
    // Reference expansion
    // ========================================================================

    /// Bulk-fill tracks and submission types ahead of a list request.
    /// Bounded queries skip the heuristic; so does a disabled cache.
    async fn maybe_prepopulate(&self, event: &EventSlug, params: &QueryParams) -> Result<()> {
        if !self.cache.prepopulation_enabled() {
            return Ok(());
        }
        if let Some(limit) = params.declared_limit() {
            if limit < defaults::PREPOPULATE_MIN_QUERY {
                return Ok(());
            }
        }
        self.cache
            .bulk_prepopulate(&self.fetcher, CacheKind::Tracks, event)
            .await?;
        self.cache
            .bulk_prepopulate(&self.fetcher, CacheKind::SubmissionTypes, event)
            .await?;
        Ok(())
    }

    /// Materialize every reference on a proposal. A cache miss triggers
    /// a single detail fetch, a put, and a retry through the cache.
    pub async fn expand_proposal(&self, event: &EventSlug, proposal: &mut Proposal) -> Result<()> {
        if let Some(track) = proposal.track.as_mut() {
            if let Some(&id) = track.as_ref_id() {
                let record = self.track(event, id).await?;
                track.expand(record);
            }
        }

        if let Some(&id) = proposal.submission_type.as_ref_id() {
            let record = self.submission_type(event, id).await?;
            proposal.submission_type.expand(record);
        }

        for speaker in proposal.speakers.iter_mut() {
            if let Some(code) = speaker.as_ref_id().cloned() {
                let record = self.resolve_speaker(event, &code).await?;
                speaker.expand(record);
            }
        }

        for answer in proposal.answers.iter_mut() {
            if let Some(&id) = answer.as_ref_id() {
                let record = self.resolve_answer(event, id).await?;
                answer.expand(record);
            }
        }
        Ok(())
    }

    /// Materialize answer references on a speaker record.
    pub async fn expand_speaker(&self, event: &EventSlug, speaker: &mut Speaker) -> Result<()> {
        for answer in speaker.answers.iter_mut() {
            if let Some(&id) = answer.as_ref_id() {
                let record = self.resolve_answer(event, id).await?;
                answer.expand(record);
            }
        }
        Ok(())
    }

    async fn resolve_speaker(&self, event: &EventSlug, code: &SpeakerCode) -> Result<Speaker> {
        if let Some(speaker) = self.cache.get_speaker(code).await {
            return Ok(speaker);
        }
        let path = Self::detail_path(event, "speakers", code.as_str());
        let speaker: Speaker = self.fetcher.fetch_detail(&path, &QueryParams::new()).await?;
        self.cache.put_speaker(speaker.clone()).await;
        Ok(speaker)
    }

    async fn resolve_answer(&self, event: &EventSlug, id: AnswerId) -> Result<Answer> {
        if let Some(answer) = self.cache.get_answer(id).await {
            return Ok(answer);
        }
        let path = Self::detail_path(event, "answers", &id.to_string());
        let mut answer: Answer = self.fetcher.fetch_detail(&path, &QueryParams::new()).await?;
        if let Some(&question_id) = answer.question.as_ref_id() {
            let question = self.question(event, question_id).await?;
            answer.question.expand(question);
        }
        self.cache.put_answer(answer.clone()).await;
        Ok(answer)
    }
}

// ============================================================================
// Expanded proposal stream
// ============================================================================

/// Lazy proposal sequence that expands references before yielding, so
/// consumers always observe the nested form.
pub struct ProposalStream {
    client: UpstreamClient,
    event: EventSlug,
    inner: Paginated<Proposal>,
}

impl ProposalStream {
    fn new(client: UpstreamClient, event: EventSlug, inner: Paginated<Proposal>) -> Self {
        Self {
            client,
            event,
            inner,
        }
    }

    pub fn count(&self) -> u64 {
        self.inner.count()
    }

    pub async fn next(&mut self) -> Option<Result<Proposal>> {
        loop {
            match self.inner.next().await? {
                Ok(mut proposal) => {
                    match self
                        .client
                        .expand_proposal(&self.event, &mut proposal)
                        .await
                    {
                        Ok(()) => return Some(Ok(proposal)),
                        Err(error) if self.client.lenient => {
                            tracing::warn!(
                                code = %proposal.code,
                                %error,
                                "dropping proposal with unresolvable references"
                            );
                        }
                        Err(error) => return Some(Err(error)),
                    }
                }
                Err(error) => return Some(Err(error)),
            }
        }
    }

    pub async fn collect(mut self) -> Result<Vec<Proposal>> {
        let mut proposals = Vec::new();
        while let Some(proposal) = self.next().await {
            proposals.push(proposal?);
        }
        Ok(proposals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let event = EventSlug::from("rustconf-2026");
        assert_eq!(
            UpstreamClient::event_path(&event, "submissions"),
            "/api/events/rustconf-2026/submissions/"
        );
        assert_eq!(
            UpstreamClient::detail_path(&event, "tracks", "7"),
            "/api/events/rustconf-2026/tracks/7/"
        );
    }
}
