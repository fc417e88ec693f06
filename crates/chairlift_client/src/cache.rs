//! Process-local expansion cache for auxiliary entities.
//!
//! Write-through maps keyed per entity kind. Wire data is immutable
//! within a session, so entries live until explicit `clear` or process
//! end; a soft cap drops least-recently-inserted entries on overflow.
//! Gets are shared, puts exclusive.

use crate::error::Result;
use crate::fetch::{Fetcher, QueryParams};
use chairlift_protocol::types::{
    Answer, AnswerId, EventSlug, Question, QuestionId, Room, RoomId, Speaker, SpeakerCode,
    SubmissionType, SubmissionTypeId, Track, TrackId,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

// ============================================================================
// Kinds
// ============================================================================

/// Auxiliary entity kinds the cache can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Tracks,
    SubmissionTypes,
    Speakers,
    Answers,
    Questions,
    Rooms,
}

impl CacheKind {
    pub const ALL: &'static [CacheKind] = &[
        CacheKind::Tracks,
        CacheKind::SubmissionTypes,
        CacheKind::Speakers,
        CacheKind::Answers,
        CacheKind::Questions,
        CacheKind::Rooms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Tracks => "tracks",
            CacheKind::SubmissionTypes => "submission-types",
            CacheKind::Speakers => "speakers",
            CacheKind::Answers => "answers",
            CacheKind::Questions => "questions",
            CacheKind::Rooms => "rooms",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Per-kind store
// ============================================================================

/// Insertion-ordered map with an optional soft cap. On overflow the
/// least-recently-inserted key is dropped.
struct Store<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    soft_cap: Option<usize>,
}

impl<K: Clone + Eq + Hash, V: Clone> Store<K, V> {
    fn new(soft_cap: Option<usize>) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            soft_cap,
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).cloned()
    }

    fn put(&mut self, key: K, value: V) {
        if self.map.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
            if let Some(cap) = self.soft_cap {
                while self.order.len() > cap {
                    if let Some(oldest) = self.order.pop_front() {
                        self.map.remove(&oldest);
                    }
                }
            }
        }
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

// ============================================================================
// Expansion cache
// ============================================================================

pub struct ExpansionCache {
    tracks: RwLock<Store<TrackId, Track>>,
    submission_types: RwLock<Store<SubmissionTypeId, SubmissionType>>,
    speakers: RwLock<Store<SpeakerCode, Speaker>>,
    answers: RwLock<Store<AnswerId, Answer>>,
    questions: RwLock<Store<QuestionId, Question>>,
    rooms: RwLock<Store<RoomId, Room>>,
    prepopulation: AtomicBool,
    prepopulated: RwLock<HashSet<(EventSlug, CacheKind)>>,
}

impl Default for ExpansionCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ExpansionCache {
    /// No eviction by default; `soft_cap` bounds each kind separately.
    pub fn new(soft_cap: Option<usize>) -> Self {
        Self {
            tracks: RwLock::new(Store::new(soft_cap)),
            submission_types: RwLock::new(Store::new(soft_cap)),
            speakers: RwLock::new(Store::new(soft_cap)),
            answers: RwLock::new(Store::new(soft_cap)),
            questions: RwLock::new(Store::new(soft_cap)),
            rooms: RwLock::new(Store::new(soft_cap)),
            prepopulation: AtomicBool::new(true),
            prepopulated: RwLock::new(HashSet::new()),
        }
    }

    /// Disable or re-enable the bulk-fetch heuristic.
    pub fn set_prepopulation(&self, enabled: bool) {
        self.prepopulation.store(enabled, Ordering::SeqCst);
    }

    pub fn prepopulation_enabled(&self) -> bool {
        self.prepopulation.load(Ordering::SeqCst)
    }

    pub async fn get_track(&self, id: TrackId) -> Option<Track> {
        self.tracks.read().await.get(&id)
    }

    pub async fn put_track(&self, track: Track) {
        self.tracks.write().await.put(track.id, track);
    }

    pub async fn get_submission_type(&self, id: SubmissionTypeId) -> Option<SubmissionType> {
        self.submission_types.read().await.get(&id)
    }

    pub async fn put_submission_type(&self, submission_type: SubmissionType) {
        self.submission_types
            .write()
            .await
            .put(submission_type.id, submission_type);
    }

    pub async fn get_speaker(&self, code: &SpeakerCode) -> Option<Speaker> {
        self.speakers.read().await.get(code)
    }

    pub async fn put_speaker(&self, speaker: Speaker) {
        self.speakers
            .write()
            .await
            .put(speaker.code.clone(), speaker);
    }

    pub async fn get_answer(&self, id: AnswerId) -> Option<Answer> {
        self.answers.read().await.get(&id)
    }

    pub async fn put_answer(&self, answer: Answer) {
        self.answers.write().await.put(answer.id, answer);
    }

    pub async fn get_question(&self, id: QuestionId) -> Option<Question> {
        self.questions.read().await.get(&id)
    }

    pub async fn put_question(&self, question: Question) {
        self.questions.write().await.put(question.id, question);
    }

    pub async fn get_room(&self, id: RoomId) -> Option<Room> {
        self.rooms.read().await.get(&id)
    }

    pub async fn put_room(&self, room: Room) {
        self.rooms.write().await.put(room.id, room);
    }

    /// Entries currently held for a kind.
    pub async fn len(&self, kind: CacheKind) -> usize {
        match kind {
            CacheKind::Tracks => self.tracks.read().await.len(),
            CacheKind::SubmissionTypes => self.submission_types.read().await.len(),
            CacheKind::Speakers => self.speakers.read().await.len(),
            CacheKind::Answers => self.answers.read().await.len(),
            CacheKind::Questions => self.questions.read().await.len(),
            CacheKind::Rooms => self.rooms.read().await.len(),
        }
    }

    /// Drop one kind, or everything when `kind` is `None`. Also forgets
    /// prepopulation marks for the cleared kinds.
    pub async fn clear(&self, kind: Option<CacheKind>) {
        let kinds: &[CacheKind] = match kind {
            Some(ref k) => std::slice::from_ref(k),
            None => CacheKind::ALL,
        };
        for kind in kinds {
            match kind {
                CacheKind::Tracks => self.tracks.write().await.clear(),
                CacheKind::SubmissionTypes => self.submission_types.write().await.clear(),
                CacheKind::Speakers => self.speakers.write().await.clear(),
                CacheKind::Answers => self.answers.write().await.clear(),
                CacheKind::Questions => self.questions.write().await.clear(),
                CacheKind::Rooms => self.rooms.write().await.clear(),
            }
        }
        let mut marks = self.prepopulated.write().await;
        marks.retain(|(_, k)| !kinds.contains(k));
    }

    pub async fn is_prepopulated(&self, event: &EventSlug, kind: CacheKind) -> bool {
        self.prepopulated
            .read()
            .await
            .contains(&(event.clone(), kind))
    }

    /// Fill an entire kind for an event with one list request.
    pub async fn bulk_prepopulate(
        &self,
        fetcher: &Fetcher,
        kind: CacheKind,
        event: &EventSlug,
    ) -> Result<()> {
        if self.is_prepopulated(event, kind).await {
            return Ok(());
        }
        let params = QueryParams::new();
        match kind {
            CacheKind::Tracks => {
                let path = format!("/api/events/{event}/tracks/");
                let (_, tracks): (u64, Vec<Track>) = fetcher.fetch_all(&path, &params).await?;
                for track in tracks {
                    self.put_track(track).await;
                }
            }
            CacheKind::SubmissionTypes => {
                let path = format!("/api/events/{event}/submission-types/");
                let (_, types): (u64, Vec<SubmissionType>) =
                    fetcher.fetch_all(&path, &params).await?;
                for submission_type in types {
                    self.put_submission_type(submission_type).await;
                }
            }
            CacheKind::Speakers => {
                let path = format!("/api/events/{event}/speakers/");
                let (_, speakers): (u64, Vec<Speaker>) = fetcher.fetch_all(&path, &params).await?;
                for speaker in speakers {
                    self.put_speaker(speaker).await;
                }
            }
            CacheKind::Answers => {
                let path = format!("/api/events/{event}/answers/");
                let (_, answers): (u64, Vec<Answer>) = fetcher.fetch_all(&path, &params).await?;
                for answer in answers {
                    self.put_answer(answer).await;
                }
            }
            CacheKind::Questions => {
                let path = format!("/api/events/{event}/questions/");
                let (_, questions): (u64, Vec<Question>) =
                    fetcher.fetch_all(&path, &params).await?;
                for question in questions {
                    self.put_question(question).await;
                }
            }
            CacheKind::Rooms => {
                let path = format!("/api/events/{event}/rooms/");
                let (_, rooms): (u64, Vec<Room>) = fetcher.fetch_all(&path, &params).await?;
                for room in rooms {
                    self.put_room(room).await;
                }
            }
        }
        tracing::debug!(kind = %kind, event = %event, "prepopulated cache");
        self.prepopulated
            .write()
            .await
            .insert((event.clone(), kind));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chairlift_protocol::types::MultiLingualString;

    fn track(id: u64, name: &str) -> Track {
        Track {
            id: TrackId::new(id),
            name: MultiLingualString::en(name),
        }
    }

    #[tokio::test]
    async fn test_put_get_idempotent() {
        let cache = ExpansionCache::default();
        let t = track(7, "PyData: ML");
        cache.put_track(t.clone()).await;
        cache.put_track(t.clone()).await;
        assert_eq!(cache.get_track(TrackId::new(7)).await, Some(t.clone()));
        // Two sequential reads between puts yield the same value.
        assert_eq!(
            cache.get_track(TrackId::new(7)).await,
            cache.get_track(TrackId::new(7)).await
        );
        assert_eq!(cache.len(CacheKind::Tracks).await, 1);
    }

    #[tokio::test]
    async fn test_miss_is_none() {
        let cache = ExpansionCache::default();
        assert_eq!(cache.get_track(TrackId::new(1)).await, None);
        assert_eq!(cache.get_speaker(&SpeakerCode::from("NOPE")).await, None);
    }

    #[tokio::test]
    async fn test_soft_cap_drops_least_recently_inserted() {
        let cache = ExpansionCache::new(Some(2));
        cache.put_track(track(1, "one")).await;
        cache.put_track(track(2, "two")).await;
        cache.put_track(track(3, "three")).await;
        assert_eq!(cache.get_track(TrackId::new(1)).await, None);
        assert!(cache.get_track(TrackId::new(2)).await.is_some());
        assert!(cache.get_track(TrackId::new(3)).await.is_some());
    }

    #[tokio::test]
    async fn test_clear_kind_and_all() {
        let cache = ExpansionCache::default();
        cache.put_track(track(1, "one")).await;
        cache
            .put_room(Room {
                id: RoomId::new(9),
                name: MultiLingualString::en("Main Hall"),
                capacity: 500,
                availabilities: vec![],
            })
            .await;

        cache.clear(Some(CacheKind::Tracks)).await;
        assert_eq!(cache.len(CacheKind::Tracks).await, 0);
        assert_eq!(cache.len(CacheKind::Rooms).await, 1);

        cache.clear(None).await;
        assert_eq!(cache.len(CacheKind::Rooms).await, 0);
    }

    #[tokio::test]
    async fn test_prepopulation_toggle() {
        let cache = ExpansionCache::default();
        assert!(cache.prepopulation_enabled());
        cache.set_prepopulation(false);
        assert!(!cache.prepopulation_enabled());
    }
}
