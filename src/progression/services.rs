use super::dto::UserStats;

pub const STREAK_BONUS_PER_DAY: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub id: u8,
    pub title: &'static str,
    /// Highest score still inside this level; `None` means unbounded.
    pub ceiling: Option<f64>,
}

pub static LEVELS: [Level; 5] = [
    Level { id: 1, title: "The Ectomorph", ceiling: Some(150.0) },
    Level { id: 2, title: "The Novice", ceiling: Some(600.0) },
    Level { id: 3, title: "The Athlete", ceiling: Some(1500.0) },
    Level { id: 4, title: "The Tank", ceiling: Some(3500.0) },
    Level { id: 5, title: "The Legend", ceiling: None },
];

pub fn score(total_protein: f64, streak_days: u32) -> f64 {
    let protein = if total_protein.is_finite() { total_protein.max(0.0) } else { 0.0 };
    protein + f64::from(streak_days) * STREAK_BONUS_PER_DAY
}

/// First level whose ceiling is not exceeded; a score equal to a ceiling stays in that level.
pub fn level_for(score: f64) -> &'static Level {
    LEVELS
        .iter()
        .find(|l| l.ceiling.map_or(true, |c| score <= c))
        .unwrap_or(&LEVELS[LEVELS.len() - 1])
}

pub fn compute_stats(total_protein: f64, streak_days: u32) -> UserStats {
    let muscle_score = score(total_protein, streak_days);
    let level = level_for(muscle_score);
    UserStats {
        muscle_score,
        level: level.id,
        level_title: level.title.to_uppercase(),
        next_level_score: level.ceiling,
    }
}

/// Share of the current level's ceiling reached, capped at 100.
pub fn progress_percent(stats: &UserStats) -> f64 {
    match stats.next_level_score {
        Some(next) if next > 0.0 => (stats.muscle_score / next * 100.0).min(100.0),
        _ => 100.0,
    }
}

/// Placeholder avatars: humans for levels 1-2, monsters for 3-4, mechs beyond.
pub fn avatar_url(level: u8) -> String {
    let seed = format!("muscle_avatar_lvl_{level}");
    let set = match level {
        0..=2 => "set5",
        3..=4 => "set2",
        _ => "set1",
    };
    format!("https://robohash.org/{seed}?set={set}&bg=set1")
}

#[cfg(test)]
mod progression_tests {
    use super::*;

    #[test]
    fn score_adds_streak_bonus() {
        assert_eq!(score(73.0, 5), 123.0);
        assert_eq!(score(0.0, 0), 0.0);
        assert_eq!(score(-20.0, 1), 10.0);
        assert_eq!(score(f64::NAN, 2), 20.0);
    }

    #[test]
    fn ceiling_belongs_to_lower_level() {
        let at = compute_stats(150.0, 0);
        assert_eq!(at.level, 1);
        assert_eq!(at.level_title, "THE ECTOMORPH");
        assert_eq!(at.next_level_score, Some(150.0));

        let above = compute_stats(151.0, 0);
        assert_eq!(above.level, 2);
        assert_eq!(above.level_title, "THE NOVICE");
        assert_eq!(above.next_level_score, Some(600.0));
    }

    #[test]
    fn level_table_walk() {
        let cases = [
            (0.0, 1),
            (600.0, 2),
            (600.5, 3),
            (1500.0, 3),
            (3500.0, 4),
            (3501.0, 5),
            (1_000_000.0, 5),
        ];
        for (score, level) in cases {
            assert_eq!(level_for(score).id, level, "score {score}");
        }
    }

    #[test]
    fn max_level_is_unbounded() {
        let stats = compute_stats(10_000.0, 30);
        assert_eq!(stats.level, 5);
        assert_eq!(stats.level_title, "THE LEGEND");
        assert_eq!(stats.next_level_score, None);
        assert_eq!(progress_percent(&stats), 100.0);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["nextLevelScore"].is_null());
        assert_eq!(json["muscleScore"], 10_300.0);
    }

    #[test]
    fn compute_stats_is_deterministic() {
        let a = compute_stats(431.5, 12);
        let b = compute_stats(431.5, 12);
        assert_eq!(a, b);
        assert_eq!(a.muscle_score, 551.5);
        assert_eq!(a.level, 2);
    }

    #[test]
    fn progress_is_capped() {
        let stats = compute_stats(75.0, 0);
        assert_eq!(progress_percent(&stats), 50.0);
    }

    #[test]
    fn avatar_sets_follow_level() {
        assert_eq!(
            avatar_url(1),
            "https://robohash.org/muscle_avatar_lvl_1?set=set5&bg=set1"
        );
        assert!(avatar_url(2).contains("set=set5"));
        assert!(avatar_url(3).contains("set=set2"));
        assert!(avatar_url(4).contains("set=set2"));
        assert!(avatar_url(5).contains("set=set1"));
    }
}
