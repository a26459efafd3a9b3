//! Tracks: ordered sequences of clips and gaps.

use serde::{Deserialize, Serialize};

use cinecut_common::time::FrameRate;

use crate::media::{Clip, Gap};

/// Track kind. Audio tracks never contribute a video signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        }
    }
}

/// One child of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum TrackItem {
    Clip(Clip),
    Gap(Gap),
}

/// An ordered sequence of clips and gaps. Child order is the sole
/// compositing/ordering signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub kind: TrackKind,

    /// Display name, empty when the editor never named the track.
    #[serde(default)]
    pub name: String,

    pub children: Vec<TrackItem>,
}

impl Track {
    /// Total track duration as an exact frame count at `rate`.
    pub fn duration_frames(&self, rate: FrameRate) -> i64 {
        self.children
            .iter()
            .map(|item| match item {
                TrackItem::Clip(clip) => clip.source_range.duration.to_frames(rate),
                TrackItem::Gap(gap) => gap.duration.to_frames(rate),
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaReference;
    use cinecut_common::time::{RationalTime, TimeRange};

    fn external_clip(id: &str, duration_frames: i64, rate: FrameRate) -> TrackItem {
        TrackItem::Clip(Clip {
            name: String::new(),
            source_range: TimeRange::new(
                RationalTime::zero(rate),
                RationalTime::new(duration_frames, rate),
            ),
            reference: MediaReference::External {
                id: id.to_string(),
                target_url: format!("/media/{id}.mp4"),
                available_range: None,
            },
        })
    }

    #[test]
    fn test_track_duration_sums_children_in_order() {
        let rate = FrameRate::whole(30);
        let track = Track {
            kind: TrackKind::Video,
            name: "V1".to_string(),
            children: vec![
                TrackItem::Gap(Gap {
                    duration: RationalTime::new(30, rate),
                }),
                external_clip("a", 60, rate),
                external_clip("b", 45, rate),
            ],
        };

        assert_eq!(track.duration_frames(rate), 135);
    }

    #[test]
    fn test_track_item_json_tagging() {
        let rate = FrameRate::whole(30);
        let gap = TrackItem::Gap(Gap {
            duration: RationalTime::new(15, rate),
        });

        let json = serde_json::to_value(&gap).unwrap();
        assert_eq!(json["item"], "gap");

        let parsed: TrackItem = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, gap);
    }

    #[test]
    fn test_empty_track_has_zero_duration() {
        let track = Track {
            kind: TrackKind::Audio,
            name: String::new(),
            children: vec![],
        };
        assert_eq!(track.duration_frames(FrameRate::whole(30)), 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn track_of(children: Vec<TrackItem>) -> Track {
            Track {
                kind: TrackKind::Video,
                name: String::new(),
                children,
            }
        }

        proptest! {
            #[test]
            fn track_total_equals_sum_of_children(
                segments in prop::collection::vec((any::<bool>(), 0i64..10_000), 0..64),
            ) {
                let rate = FrameRate::whole(30);
                let children = segments
                    .iter()
                    .map(|&(is_gap, frames)| {
                        if is_gap {
                            TrackItem::Gap(Gap {
                                duration: RationalTime::new(frames, rate),
                            })
                        } else {
                            external_clip("seg", frames, rate)
                        }
                    })
                    .collect();

                let expected: i64 = segments.iter().map(|&(_, frames)| frames).sum();
                prop_assert_eq!(track_of(children).duration_frames(rate), expected);
            }

            #[test]
            fn rescaled_children_sum_without_drift(
                segments in prop::collection::vec(0i64..10_000, 1..64),
            ) {
                // Clips cut at 60 fps on a 30 fps timeline: every even frame
                // count rescales exactly, so the track total must too.
                let source = FrameRate::whole(60);
                let project = FrameRate::whole(30);
                let children = segments
                    .iter()
                    .map(|&frames| {
                        TrackItem::Gap(Gap {
                            duration: RationalTime::new(frames * 2, source),
                        })
                    })
                    .collect();

                let expected: i64 = segments.iter().sum();
                prop_assert_eq!(track_of(children).duration_frames(project), expected);
            }
        }
    }
}
