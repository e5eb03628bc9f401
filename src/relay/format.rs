// Message text for everything the bot says about tracks

use crate::player::Track;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// How many upcoming tracks the queue command shows
pub const QUEUE_PREVIEW_LEN: usize = 5;

/// `"{artist} - {name}"`, first listed artist only
pub fn format_track(track: &Track) -> String {
    let artist = track.first_artist().unwrap_or(UNKNOWN_ARTIST);
    format!("{} - {}", artist, track.name)
}

pub fn playing_message(track: &Track) -> String {
    format!("Playing: {}", format_track(track))
}

pub fn current_track_message(track: Option<&Track>) -> String {
    let what = track.map(format_track).unwrap_or_else(|| "Nothing".to_string());
    format!("Currently playing: {}", what)
}

/// The tracks after the current one, at most [`QUEUE_PREVIEW_LEN`] of them.
///
/// `index` is the position of the playing track; `None` means nothing is
/// playing and the preview starts at the head of the tracklist.
pub fn upcoming(tracks: &[Track], index: Option<usize>) -> &[Track] {
    let start = index.map_or(0, |i| i.saturating_add(1)).min(tracks.len());
    let end = start.saturating_add(QUEUE_PREVIEW_LEN).min(tracks.len());
    &tracks[start..end]
}

pub fn queue_message(tracks: &[Track], index: Option<usize>) -> String {
    let lines: Vec<String> = upcoming(tracks, index)
        .iter()
        .enumerate()
        .map(|(i, track)| format!("{}. {}", i + 1, format_track(track)))
        .collect();
    format!("Here is the queue:\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracklist(names: &[&str]) -> Vec<Track> {
        names.iter().map(|n| Track::new(*n, &["Band"])).collect()
    }

    #[test]
    fn test_format_uses_first_artist() {
        let track = Track::new("Heavy Is the Crown", &["Linkin Park", "Someone Else"]);
        assert_eq!(format_track(&track), "Linkin Park - Heavy Is the Crown");
    }

    #[test]
    fn test_format_without_artist() {
        let track = Track::new("Mystery", &[]);
        assert_eq!(format_track(&track), "Unknown Artist - Mystery");

        let track: Track = serde_json::from_str(r#"{"name": "Nameless Tune"}"#).unwrap();
        assert_eq!(format_track(&track), "Unknown Artist - Nameless Tune");
    }

    #[test]
    fn test_current_track_messages() {
        let track = Track::new("Gold", &["Spandau Ballet"]);
        assert_eq!(
            current_track_message(Some(&track)),
            "Currently playing: Spandau Ballet - Gold"
        );
        assert_eq!(current_track_message(None), "Currently playing: Nothing");
        assert_eq!(playing_message(&track), "Playing: Spandau Ballet - Gold");
    }

    #[test]
    fn test_upcoming_window() {
        let tracks = tracklist(&["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
        let names: Vec<&str> = upcoming(&tracks, Some(2)).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["3", "4", "5", "6", "7"]);
    }

    #[test]
    fn test_upcoming_clamps_at_tail() {
        let tracks = tracklist(&["A", "B", "C", "D", "E", "F", "G"]);
        let names: Vec<&str> = upcoming(&tracks, Some(5)).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["G"]);

        assert!(upcoming(&tracks, Some(6)).is_empty());
        assert!(upcoming(&tracks, Some(40)).is_empty());
    }

    #[test]
    fn test_upcoming_when_nothing_plays() {
        let tracks = tracklist(&["A", "B", "C", "D", "E", "F", "G"]);
        let names: Vec<&str> = upcoming(&tracks, None).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_queue_message_numbering() {
        let tracks = vec![
            Track::new("Now", &["X"]),
            Track::new("Soon", &["Y"]),
            Track::new("Later", &[]),
        ];
        assert_eq!(
            queue_message(&tracks, Some(0)),
            "Here is the queue:\n1. Y - Soon\n2. Unknown Artist - Later"
        );
    }
}
