use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::models::{Category, Sign};
use crate::score::{round1, EntityScores, Tier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub burc: Sign,
    pub score: f64,
    /// Absent on the composite list.
    #[serde(default)]
    pub sentiment: Option<Tier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaders {
    #[serde(rename = "en_şanslı")]
    pub luckiest: Option<RankEntry>,
    #[serde(rename = "en_aşık")]
    pub most_in_love: Option<RankEntry>,
    #[serde(rename = "en_zengin")]
    pub richest: Option<RankEntry>,
    #[serde(rename = "en_sağlıklı")]
    pub healthiest: Option<RankEntry>,
    #[serde(rename = "en_şanssız")]
    pub unluckiest: Option<RankEntry>,
}

/// One run's leaderboards. The `genel` list ranks the composite score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rankings {
    pub genel_ranking: Vec<RankEntry>,
    #[serde(rename = "aşk_ranking")]
    pub ask_ranking: Vec<RankEntry>,
    pub para_ranking: Vec<RankEntry>,
    #[serde(rename = "sağlık_ranking")]
    pub saglik_ranking: Vec<RankEntry>,
    pub leaders: Leaders,
}

impl Rankings {
    pub fn list(&self, cat: Category) -> &[RankEntry] {
        match cat {
            Category::General => &self.genel_ranking,
            Category::Love => &self.ask_ranking,
            Category::Money => &self.para_ranking,
            Category::Health => &self.saglik_ranking,
        }
    }
}

/// Descending by score; `sort_by` keeps input order on ties.
fn sort_desc<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(std::cmp::Ordering::Equal));
}

pub fn rank(scores: &BTreeMap<Sign, EntityScores>) -> Rankings {
    let mut composite: Vec<RankEntry> = scores
        .iter()
        .filter(|(_, s)| s.toplam > 0.0)
        .map(|(sign, s)| RankEntry {
            burc: *sign,
            score: s.toplam,
            sentiment: None,
        })
        .collect();
    sort_desc(&mut composite, |e| e.score);

    let category = |cat: Category| {
        let mut list: Vec<RankEntry> = scores
            .iter()
            .filter_map(|(sign, s)| {
                let r = s.get(cat)?;
                (r.score > 0.0).then(|| RankEntry {
                    burc: *sign,
                    score: r.score,
                    sentiment: Some(r.sentiment),
                })
            })
            .collect();
        sort_desc(&mut list, |e| e.score);
        list
    };

    let mut rankings = Rankings {
        genel_ranking: composite,
        ask_ranking: category(Category::Love),
        para_ranking: category(Category::Money),
        saglik_ranking: category(Category::Health),
        leaders: Leaders::default(),
    };
    rankings.leaders = Leaders {
        luckiest: rankings.genel_ranking.first().cloned(),
        most_in_love: rankings.ask_ranking.first().cloned(),
        richest: rankings.para_ranking.first().cloned(),
        healthiest: rankings.saglik_ranking.first().cloned(),
        unluckiest: rankings.genel_ranking.last().cloned(),
    };
    rankings
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub burc: Sign,
    pub score: f64,
}

/// Rankings of one day as kept in the history store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySnapshot {
    pub genel_ranking: Vec<HistoryEntry>,
    #[serde(rename = "aşk_ranking")]
    pub ask_ranking: Vec<HistoryEntry>,
    pub para_ranking: Vec<HistoryEntry>,
    #[serde(rename = "sağlık_ranking")]
    pub saglik_ranking: Vec<HistoryEntry>,
}

impl DaySnapshot {
    pub fn list(&self, cat: Category) -> &[HistoryEntry] {
        match cat {
            Category::General => &self.genel_ranking,
            Category::Love => &self.ask_ranking,
            Category::Money => &self.para_ranking,
            Category::Health => &self.saglik_ranking,
        }
    }

    fn list_mut(&mut self, cat: Category) -> &mut Vec<HistoryEntry> {
        match cat {
            Category::General => &mut self.genel_ranking,
            Category::Love => &mut self.ask_ranking,
            Category::Money => &mut self.para_ranking,
            Category::Health => &mut self.saglik_ranking,
        }
    }
}

impl From<&Rankings> for DaySnapshot {
    fn from(r: &Rankings) -> Self {
        let strip = |list: &[RankEntry]| {
            list.iter()
                .map(|e| HistoryEntry {
                    burc: e.burc,
                    score: e.score,
                })
                .collect()
        };
        Self {
            genel_ranking: strip(&r.genel_ranking),
            ask_ranking: strip(&r.ask_ranking),
            para_ranking: strip(&r.para_ranking),
            saglik_ranking: strip(&r.saglik_ranking),
        }
    }
}

/// Dated rankings. Serialized with the most recent date first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    days: BTreeMap<NaiveDate, DaySnapshot>,
}

impl Serialize for HistoryStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for (date, snapshot) in self.days.iter().rev() {
            map.serialize_entry(date, snapshot)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HistoryStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Self {
            days: BTreeMap::deserialize(deserializer)?,
        })
    }
}

impl HistoryStore {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Insert `snapshot` for `date`. Returns true when an existing day was
    /// overwritten.
    pub fn merge(&mut self, date: NaiveDate, snapshot: DaySnapshot) -> bool {
        let replaced = self.days.insert(date, snapshot).is_some();
        if replaced {
            warn!("History already had this date, overwriting - date={}", date);
        }
        replaced
    }

    /// Missing file means an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No history file yet - path={}", path.display());
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path).with_context(|| format!("Reading history {}", path.display()))?;
        let store: Self =
            serde_json::from_slice(&bytes).with_context(|| format!("Parsing history {}", path.display()))?;
        debug!("Loaded history - path={}, days={}", path.display(), store.len());
        Ok(store)
    }

    /// Write the whole store to a temp file next to `path`, then rename it
    /// into place. The previous file survives any failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))?;

        let bytes = serde_json::to_vec_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Creating temp file in {}", dir.display()))?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Replacing history {}", path.display()))?;

        info!("Saved history - path={}, days={}", path.display(), self.len());
        Ok(())
    }

    /// Dates feeding a `period` view ending at `target`.
    pub fn select_dates(&self, period: Period, target: NaiveDate) -> Vec<NaiveDate> {
        let n = period.days();
        let window_start = target - Duration::days(n as i64 - 1);
        let in_window: Vec<NaiveDate> = self.days.range(window_start..=target).map(|(d, _)| *d).collect();
        if !in_window.is_empty() {
            return in_window;
        }
        let fallback: Vec<NaiveDate> = self.days.keys().rev().take(n).copied().collect();
        if !fallback.is_empty() {
            debug!(
                "No history in window, using most recent dates - period={}, target={}, dates={}",
                period,
                target,
                fallback.len()
            );
        }
        fallback.into_iter().rev().collect()
    }

    /// Average each sign's score per category over the selected days and
    /// re-rank. `None` when the store is empty.
    pub fn leaderboard(&self, period: Period, target: NaiveDate) -> Option<Leaderboard> {
        let dates = self.select_dates(period, target);
        let (first, last) = (*dates.first()?, *dates.last()?);

        let mut averaged = DaySnapshot::default();
        for cat in Category::ALL {
            let mut sums: BTreeMap<Sign, (f64, usize)> = BTreeMap::new();
            for d in &dates {
                let Some(day) = self.days.get(d) else { continue };
                for e in day.list(cat) {
                    let slot = sums.entry(e.burc).or_insert((0.0, 0));
                    slot.0 += e.score;
                    slot.1 += 1;
                }
            }
            let mut list: Vec<HistoryEntry> = sums
                .into_iter()
                .map(|(burc, (sum, n))| HistoryEntry {
                    burc,
                    score: round1(sum / n as f64),
                })
                .filter(|e| e.score > 0.0)
                .collect();
            sort_desc(&mut list, |e| e.score);
            *averaged.list_mut(cat) = list;
        }

        Some(Leaderboard {
            period,
            start_date: first,
            end_date: last,
            days: dates.len(),
            rankings: averaged,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub fn days(self) -> usize {
        match self {
            Period::Daily => 1,
            Period::Weekly => 7,
            Period::Monthly => 30,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub period: Period,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: usize,
    pub rankings: DaySnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{ScoreDetails, ScoreResult};

    fn result(score: f64) -> ScoreResult {
        ScoreResult {
            score,
            sentiment: Tier::from_score(score),
            source_count: 1,
            details: ScoreDetails {
                positive_count: 0,
                negative_count: 0,
                positive_score: 0.0,
                negative_score: 0.0,
                category_boost: 0.0,
                net_score: 0.0,
            },
        }
    }

    fn entity(toplam: f64, love: Option<f64>) -> EntityScores {
        EntityScores {
            ask: love.map(result),
            toplam,
            ..Default::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn snapshot(entries: &[(Sign, f64)]) -> DaySnapshot {
        DaySnapshot {
            genel_ranking: entries.iter().map(|(burc, score)| HistoryEntry { burc: *burc, score: *score }).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn ranking_is_descending_stable_and_positive() {
        let mut scores = BTreeMap::new();
        scores.insert(Sign::Koc, entity(60.0, Some(80.0)));
        scores.insert(Sign::Boga, entity(70.0, None));
        scores.insert(Sign::Ikizler, entity(60.0, Some(0.0)));
        scores.insert(Sign::Yengec, entity(0.0, None));

        let r = rank(&scores);
        let order: Vec<Sign> = r.genel_ranking.iter().map(|e| e.burc).collect();
        assert_eq!(order, vec![Sign::Boga, Sign::Koc, Sign::Ikizler]);
        assert_eq!(r.ask_ranking.len(), 1);
        assert_eq!(r.ask_ranking[0].sentiment, Some(Tier::Positive));
        assert!(r.para_ranking.is_empty());

        assert_eq!(r.leaders.luckiest.as_ref().unwrap().burc, Sign::Boga);
        assert_eq!(r.leaders.unluckiest.as_ref().unwrap().burc, Sign::Ikizler);
        assert_eq!(r.leaders.most_in_love.as_ref().unwrap().burc, Sign::Koc);
        assert!(r.leaders.richest.is_none());
    }

    #[test]
    fn rankings_serialize_with_turkish_keys() {
        let v = serde_json::to_value(rank(&BTreeMap::new())).unwrap();
        assert!(v.get("aşk_ranking").is_some());
        assert!(v["leaders"].get("en_şanslı").unwrap().is_null());
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = HistoryStore::default();
        assert!(!a.merge(date("2025-01-02"), snapshot(&[(Sign::Koc, 55.0)])));
        let once = serde_json::to_string(&a).unwrap();
        assert!(a.merge(date("2025-01-02"), snapshot(&[(Sign::Koc, 55.0)])));
        assert_eq!(serde_json::to_string(&a).unwrap(), once);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn history_is_written_most_recent_first() {
        let mut h = HistoryStore::default();
        h.merge(date("2025-01-01"), snapshot(&[(Sign::Koc, 50.0)]));
        h.merge(date("2025-01-03"), snapshot(&[(Sign::Koc, 52.0)]));
        h.merge(date("2025-01-02"), snapshot(&[(Sign::Koc, 51.0)]));
        let s = serde_json::to_string(&h).unwrap();
        let p3 = s.find("2025-01-03").unwrap();
        let p2 = s.find("2025-01-02").unwrap();
        let p1 = s.find("2025-01-01").unwrap();
        assert!(p3 < p2 && p2 < p1);
        assert!(!s.contains("sentiment"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rankings_history.json");
        assert!(HistoryStore::load(&path).unwrap().is_empty());

        let mut h = HistoryStore::default();
        h.merge(date("2025-03-01"), snapshot(&[(Sign::Kova, 61.5)]));
        h.save(&path).unwrap();
        h.merge(date("2025-03-02"), snapshot(&[(Sign::Kova, 63.0)]));
        h.save(&path).unwrap();

        let back = HistoryStore::load(&path).unwrap();
        assert_eq!(back, h);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn corrupt_history_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rankings_history.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(HistoryStore::load(&path).is_err());
    }

    #[test]
    fn weekly_average_reranks() {
        let mut h = HistoryStore::default();
        h.merge(date("2025-01-01"), snapshot(&[(Sign::Koc, 80.0), (Sign::Boga, 60.0)]));
        h.merge(date("2025-01-02"), snapshot(&[(Sign::Koc, 40.0), (Sign::Boga, 70.0)]));
        h.merge(date("2025-01-03"), snapshot(&[(Sign::Boga, 65.0)]));
        // Outside the 7-day window ending on the 3rd.
        h.merge(date("2024-12-01"), snapshot(&[(Sign::Koc, 100.0)]));

        let lb = h.leaderboard(Period::Weekly, date("2025-01-03")).unwrap();
        assert_eq!(lb.days, 3);
        assert_eq!(lb.start_date, date("2025-01-01"));
        let g = &lb.rankings.genel_ranking;
        assert_eq!(g[0], HistoryEntry { burc: Sign::Boga, score: 65.0 });
        assert_eq!(g[1], HistoryEntry { burc: Sign::Koc, score: 60.0 });
    }

    #[test]
    fn periods_fall_back_to_recent_dates() {
        let mut h = HistoryStore::default();
        h.merge(date("2025-01-01"), snapshot(&[(Sign::Koc, 50.0)]));
        h.merge(date("2025-01-05"), snapshot(&[(Sign::Koc, 70.0)]));

        assert_eq!(h.select_dates(Period::Daily, date("2025-02-01")), vec![date("2025-01-05")]);
        assert_eq!(h.select_dates(Period::Daily, date("2025-01-01")), vec![date("2025-01-01")]);
        assert_eq!(
            h.select_dates(Period::Weekly, date("2025-03-01")),
            vec![date("2025-01-01"), date("2025-01-05")]
        );
        let lb = h.leaderboard(Period::Monthly, date("2025-06-01")).unwrap();
        assert_eq!(lb.rankings.genel_ranking[0].score, 60.0);
        assert!(HistoryStore::default().leaderboard(Period::Daily, date("2025-01-01")).is_none());
    }
}
