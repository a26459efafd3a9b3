//! Timeline-to-MLT compilation.
//!
//! `compile` walks the timeline twice: a first pass collects and
//! deduplicates producers (one per distinct media id) and validates source
//! ranges; a second pass emits the program text in a fixed order (profile,
//! producers, fallback, per-track playlists, master tractor) so identical
//! input always yields byte-identical output.

use std::collections::HashMap;

use cinecut_common::error::{CinecutError, CinecutResult};
use cinecut_common::time::FrameRate;
use cinecut_timeline::{Clip, MediaReference, Timeline, Track, TrackItem, TrackKind};

use crate::profile::Profile;
use crate::xml::{escape_text, sanitize_id};

/// Producer id of the black/silent fallback source used for gaps and
/// non-external clips.
pub const FALLBACK_PRODUCER_ID: &str = "black";

/// Id of the master tractor referenced by the document root.
pub const MASTER_ID: &str = "main_tractor";

/// Extensions treated as still images; these producers need an explicit
/// frame length since the resource itself has none.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProducerKind {
    Video,
    Audio,
    Image,
}

/// One deduplicated media source in the compiled program.
#[derive(Debug)]
struct ProducerSpec {
    /// Sanitized program-level identifier (`producer_<media id>`).
    id: String,

    url: String,
    kind: ProducerKind,

    /// Usable source length in frames, when the reference declared one.
    available_frames: Option<i64>,

    /// Highest exclusive end frame any entry plays from this producer.
    needed_frames: i64,
}

/// Compile a timeline against an encode profile into an MLT XML program.
///
/// Pure and deterministic: no I/O, no clocks, and byte-identical output for
/// identical input. Errors are [`CinecutError::Compile`] for malformed
/// timelines (negative ranges, media-id collisions).
pub fn compile(timeline: &Timeline, profile: &Profile) -> CinecutResult<String> {
    let rate = profile.frame_rate();

    let producers = collect_producers(timeline, rate)?;
    let total_frames = timeline.duration().to_frames(rate).max(0);

    tracing::debug!(
        producers = producers.len(),
        total_frames,
        rate = %rate,
        "Compiling timeline"
    );

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    xml.push_str(&format!(
        "<mlt LC_NUMERIC=\"C\" version=\"7.0.0\" producer=\"{MASTER_ID}\">\n"
    ));

    write_profile(&mut xml, profile);

    for producer in &producers {
        write_producer(&mut xml, producer);
    }
    write_fallback_producer(&mut xml, total_frames);

    let mut playlist_ids: Vec<(String, TrackKind)> = Vec::new();
    for kind in [TrackKind::Video, TrackKind::Audio] {
        for (index, track) in timeline.tracks(kind).enumerate() {
            let playlist_id = format!("playlist_{}_{}", kind.as_str(), index + 1);
            write_playlist(&mut xml, &playlist_id, track, rate);
            playlist_ids.push((playlist_id, kind));
        }
    }

    write_tractor(&mut xml, &playlist_ids);

    xml.push_str("</mlt>\n");
    Ok(xml)
}

fn collect_producers(timeline: &Timeline, rate: FrameRate) -> CinecutResult<Vec<ProducerSpec>> {
    let mut producers: Vec<ProducerSpec> = Vec::new();
    let mut by_source_id: HashMap<String, usize> = HashMap::new();
    let mut by_program_id: HashMap<String, String> = HashMap::new();

    for kind in [TrackKind::Video, TrackKind::Audio] {
        for track in timeline.tracks(kind) {
            for item in &track.children {
                let clip = match item {
                    TrackItem::Clip(clip) => clip,
                    TrackItem::Gap(gap) => {
                        if gap.duration.value < 0 {
                            return Err(CinecutError::compile(format!(
                                "gap with negative duration {} on track {:?}",
                                gap.duration.value, track.name
                            )));
                        }
                        continue;
                    }
                };

                validate_clip_range(clip, track)?;

                let MediaReference::External {
                    id,
                    target_url,
                    available_range,
                } = &clip.reference
                else {
                    continue;
                };

                let in_frame = clip.source_range.start_time.to_frames(rate);
                let duration_frames = clip.source_range.duration.to_frames(rate);
                let end_frame = in_frame + duration_frames;

                if let Some(&index) = by_source_id.get(id) {
                    let existing = &mut producers[index];
                    if existing.url != *target_url {
                        return Err(CinecutError::compile(format!(
                            "media id {id:?} refers to both {:?} and {target_url:?}; \
                             media ids must identify exactly one source",
                            existing.url
                        )));
                    }
                    existing.needed_frames = existing.needed_frames.max(end_frame);
                    continue;
                }

                let program_id = format!("producer_{}", sanitize_id(id));
                if let Some(taken_by) = by_program_id.get(&program_id) {
                    return Err(CinecutError::compile(format!(
                        "media ids {taken_by:?} and {id:?} both normalize to \
                         producer id {program_id:?}"
                    )));
                }

                let producer_kind = match kind {
                    TrackKind::Audio => ProducerKind::Audio,
                    TrackKind::Video => classify_resource(target_url),
                };

                let available_frames = available_range
                    .as_ref()
                    .map(|range| range.duration.to_frames(rate));

                by_source_id.insert(id.clone(), producers.len());
                by_program_id.insert(program_id.clone(), id.clone());
                producers.push(ProducerSpec {
                    id: program_id,
                    url: target_url.clone(),
                    kind: producer_kind,
                    available_frames,
                    needed_frames: end_frame,
                });
            }
        }
    }

    Ok(producers)
}

fn validate_clip_range(clip: &Clip, track: &Track) -> CinecutResult<()> {
    let range = &clip.source_range;
    if range.start_time.value < 0 || range.duration.value < 0 {
        return Err(CinecutError::compile(format!(
            "clip {:?} on track {:?} has a negative source range (start {}, duration {})",
            clip.name, track.name, range.start_time.value, range.duration.value
        )));
    }
    Ok(())
}

/// Classify a resource by extension: known image extensions become image
/// producers, everything else plays as video.
fn classify_resource(url: &str) -> ProducerKind {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    let Some((_, extension)) = name.rsplit_once('.') else {
        return ProducerKind::Video;
    };

    let extension = extension.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        ProducerKind::Image
    } else {
        ProducerKind::Video
    }
}

fn write_profile(xml: &mut String, profile: &Profile) {
    xml.push_str(&format!(
        "  <profile description=\"{}\" width=\"{}\" height=\"{}\" progressive=\"{}\" \
         frame_rate_num=\"{}\" frame_rate_den=\"{}\"/>\n",
        escape_text(&profile.description),
        profile.width,
        profile.height,
        if profile.progressive { 1 } else { 0 },
        profile.frame_rate_num,
        profile.frame_rate_den,
    ));
}

fn write_producer(xml: &mut String, producer: &ProducerSpec) {
    xml.push_str(&format!("  <producer id=\"{}\">\n", producer.id));
    xml.push_str(&format!(
        "    <property name=\"resource\">{}</property>\n",
        escape_text(&producer.url)
    ));
    if producer.kind == ProducerKind::Image {
        // Still images carry no intrinsic duration; size them to the
        // declared available range or to the furthest frame played.
        let length = producer.available_frames.unwrap_or(producer.needed_frames);
        xml.push_str(&format!(
            "    <property name=\"length\">{length}</property>\n"
        ));
    }
    xml.push_str("  </producer>\n");
}

fn write_fallback_producer(xml: &mut String, total_frames: i64) {
    xml.push_str(&format!("  <producer id=\"{FALLBACK_PRODUCER_ID}\">\n"));
    xml.push_str("    <property name=\"resource\">black</property>\n");
    xml.push_str("    <property name=\"mlt_service\">color</property>\n");
    xml.push_str(&format!(
        "    <property name=\"length\">{total_frames}</property>\n"
    ));
    xml.push_str("  </producer>\n");
}

fn write_playlist(xml: &mut String, playlist_id: &str, track: &Track, rate: FrameRate) {
    xml.push_str(&format!("  <playlist id=\"{playlist_id}\">\n"));

    for item in &track.children {
        match item {
            TrackItem::Gap(gap) => {
                let frames = gap.duration.to_frames(rate);
                if frames > 0 {
                    xml.push_str(&format!("    <blank length=\"{frames}\"/>\n"));
                }
            }
            TrackItem::Clip(clip) => {
                let duration_frames = clip.source_range.duration.to_frames(rate);
                if duration_frames <= 0 {
                    continue;
                }

                match &clip.reference {
                    MediaReference::External { id, .. } => {
                        let in_frame = clip.source_range.start_time.to_frames(rate);
                        let out_frame = in_frame + duration_frames - 1;
                        xml.push_str(&format!(
                            "    <entry producer=\"producer_{}\" in=\"{in_frame}\" \
                             out=\"{out_frame}\"/>\n",
                            sanitize_id(id)
                        ));
                    }
                    MediaReference::Missing | MediaReference::Generator { .. } => {
                        // The clip still occupies its full duration so track
                        // totals stay exact.
                        xml.push_str(&format!(
                            "    <entry producer=\"{FALLBACK_PRODUCER_ID}\" in=\"0\" \
                             out=\"{}\"/>\n",
                            duration_frames - 1
                        ));
                    }
                }
            }
        }
    }

    xml.push_str("  </playlist>\n");
}

fn write_tractor(xml: &mut String, playlists: &[(String, TrackKind)]) {
    xml.push_str(&format!("  <tractor id=\"{MASTER_ID}\">\n"));
    xml.push_str("    <multitrack>\n");
    for (playlist_id, kind) in playlists {
        match kind {
            TrackKind::Video => {
                xml.push_str(&format!("      <track producer=\"{playlist_id}\"/>\n"));
            }
            TrackKind::Audio => {
                xml.push_str(&format!(
                    "      <track producer=\"{playlist_id}\" hide=\"video\"/>\n"
                ));
            }
        }
    }
    xml.push_str("    </multitrack>\n");
    xml.push_str("  </tractor>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinecut_common::time::{RationalTime, TimeRange};
    use cinecut_timeline::{Clip, Gap, TimelineSettings};

    const RATE: FrameRate = FrameRate { num: 30, den: 1 };

    fn external(id: &str, url: &str) -> MediaReference {
        MediaReference::External {
            id: id.to_string(),
            target_url: url.to_string(),
            available_range: None,
        }
    }

    fn clip(reference: MediaReference, start: i64, duration: i64) -> TrackItem {
        TrackItem::Clip(Clip {
            name: String::new(),
            source_range: TimeRange::new(
                RationalTime::new(start, RATE),
                RationalTime::new(duration, RATE),
            ),
            reference,
        })
    }

    fn gap(duration: i64) -> TrackItem {
        TrackItem::Gap(Gap {
            duration: RationalTime::new(duration, RATE),
        })
    }

    fn timeline(tracks: Vec<Track>) -> Timeline {
        Timeline {
            name: String::new(),
            settings: TimelineSettings { frame_rate: RATE },
            tracks,
        }
    }

    fn video_track(children: Vec<TrackItem>) -> Track {
        Track {
            kind: TrackKind::Video,
            name: String::new(),
            children,
        }
    }

    fn audio_track(children: Vec<TrackItem>) -> Track {
        Track {
            kind: TrackKind::Audio,
            name: String::new(),
            children,
        }
    }

    #[test]
    fn test_compile_is_deterministic() {
        let timeline = timeline(vec![video_track(vec![
            gap(30),
            clip(external("a", "/media/a.mp4"), 0, 60),
        ])]);
        let profile = Profile::default();

        let first = compile(&timeline, &profile).unwrap();
        let second = compile(&timeline, &profile).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_gap_then_clip_emits_blank_and_inclusive_entry() {
        let timeline = timeline(vec![video_track(vec![
            gap(30),
            clip(external("a", "/media/a.mp4"), 0, 60),
        ])]);

        let xml = compile(&timeline, &Profile::default()).unwrap();
        assert!(xml.contains("<blank length=\"30\"/>"));
        assert!(xml.contains("<entry producer=\"producer_a\" in=\"0\" out=\"59\"/>"));
        assert!(xml.contains("<playlist id=\"playlist_video_1\">"));
    }

    #[test]
    fn test_shared_source_dedups_to_one_producer() {
        let timeline = timeline(vec![
            video_track(vec![
                clip(external("shared", "/media/s.mp4"), 0, 30),
                clip(external("shared", "/media/s.mp4"), 60, 30),
                clip(external("other", "/media/o.mp4"), 0, 30),
            ]),
            video_track(vec![clip(external("shared", "/media/s.mp4"), 90, 30)]),
        ]);

        let xml = compile(&timeline, &Profile::default()).unwrap();
        let count = xml.matches("<producer id=\"producer_").count();
        assert_eq!(count, 2, "3 clips over 2 media ids must yield 2 producers");
    }

    #[test]
    fn test_colliding_media_ids_are_a_compile_error() {
        let timeline = timeline(vec![video_track(vec![
            clip(external("same", "/media/one.mp4"), 0, 30),
            clip(external("same", "/media/two.mp4"), 0, 30),
        ])]);

        let err = compile(&timeline, &Profile::default()).unwrap_err();
        assert!(matches!(err, CinecutError::Compile { .. }));
    }

    #[test]
    fn test_ids_normalizing_to_same_producer_are_a_compile_error() {
        let timeline = timeline(vec![video_track(vec![
            clip(external("clip 1", "/media/one.mp4"), 0, 30),
            clip(external("clip#1", "/media/two.mp4"), 0, 30),
        ])]);

        let err = compile(&timeline, &Profile::default()).unwrap_err();
        assert!(matches!(err, CinecutError::Compile { .. }));
    }

    #[test]
    fn test_negative_source_range_is_a_compile_error() {
        let timeline = timeline(vec![video_track(vec![clip(
            external("a", "/media/a.mp4"),
            -5,
            30,
        )])]);

        let err = compile(&timeline, &Profile::default()).unwrap_err();
        assert!(matches!(err, CinecutError::Compile { .. }));
    }

    #[test]
    fn test_missing_reference_plays_against_fallback() {
        let timeline = timeline(vec![video_track(vec![clip(
            MediaReference::Missing,
            0,
            45,
        )])]);

        let xml = compile(&timeline, &Profile::default()).unwrap();
        assert!(xml.contains("<entry producer=\"black\" in=\"0\" out=\"44\"/>"));
        // No media producers, just the fallback.
        assert_eq!(xml.matches("<producer id=\"producer_").count(), 0);
    }

    #[test]
    fn test_image_producer_declares_length() {
        let timeline = timeline(vec![video_track(vec![clip(
            external("logo", "/media/logo.png"),
            0,
            120,
        )])]);

        let xml = compile(&timeline, &Profile::default()).unwrap();
        let producer_block = xml
            .split("<producer id=\"producer_logo\">")
            .nth(1)
            .and_then(|rest| rest.split("</producer>").next())
            .unwrap();
        assert!(producer_block.contains("<property name=\"length\">120</property>"));
    }

    #[test]
    fn test_video_producer_has_no_length_property() {
        let timeline = timeline(vec![video_track(vec![clip(
            external("a", "/media/a.mp4"),
            0,
            60,
        )])]);

        let xml = compile(&timeline, &Profile::default()).unwrap();
        let producer_block = xml
            .split("<producer id=\"producer_a\">")
            .nth(1)
            .and_then(|rest| rest.split("</producer>").next())
            .unwrap();
        assert!(!producer_block.contains("length"));
    }

    #[test]
    fn test_audio_playlists_follow_video_and_hide_video() {
        let timeline = timeline(vec![
            audio_track(vec![clip(external("music", "/media/m.mp3"), 0, 90)]),
            video_track(vec![clip(external("a", "/media/a.mp4"), 0, 90)]),
        ]);

        let xml = compile(&timeline, &Profile::default()).unwrap();
        let video_pos = xml.find("<track producer=\"playlist_video_1\"/>").unwrap();
        let audio_pos = xml
            .find("<track producer=\"playlist_audio_1\" hide=\"video\"/>")
            .unwrap();
        assert!(video_pos < audio_pos);
    }

    #[test]
    fn test_fallback_sized_to_timeline_duration() {
        let timeline = timeline(vec![
            video_track(vec![gap(30), clip(external("a", "/media/a.mp4"), 0, 60)]),
            audio_track(vec![clip(external("m", "/media/m.mp3"), 0, 45)]),
        ]);

        let xml = compile(&timeline, &Profile::default()).unwrap();
        let fallback = xml
            .split("<producer id=\"black\">")
            .nth(1)
            .and_then(|rest| rest.split("</producer>").next())
            .unwrap();
        assert!(fallback.contains("<property name=\"length\">90</property>"));
    }

    #[test]
    fn test_empty_timeline_compiles_to_valid_empty_composition() {
        let timeline = timeline(vec![]);
        let xml = compile(&timeline, &Profile::default()).unwrap();

        assert!(xml.contains("<profile description=\"HD 1080p 30 fps\""));
        assert!(xml.contains("<property name=\"length\">0</property>"));
        assert!(xml.contains("<multitrack>\n    </multitrack>"));
        assert!(xml.ends_with("</mlt>\n"));
    }

    #[test]
    fn test_zero_duration_children_are_skipped() {
        let timeline = timeline(vec![video_track(vec![
            gap(0),
            clip(external("a", "/media/a.mp4"), 0, 0),
            clip(external("b", "/media/b.mp4"), 0, 30),
        ])]);

        let xml = compile(&timeline, &Profile::default()).unwrap();
        assert!(!xml.contains("<blank length=\"0\"/>"));
        assert!(!xml.contains("producer_a\" in"));
        assert!(xml.contains("<entry producer=\"producer_b\" in=\"0\" out=\"29\"/>"));
    }

    #[test]
    fn test_free_text_is_escaped() {
        let timeline = timeline(vec![video_track(vec![clip(
            external("amp", "/media/a&b <c>.mp4"),
            0,
            30,
        )])]);

        let mut profile = Profile::default();
        profile.description = "30 fps \"draft\"".to_string();

        let xml = compile(&timeline, &profile).unwrap();
        assert!(xml.contains("/media/a&amp;b &lt;c&gt;.mp4"));
        assert!(xml.contains("description=\"30 fps &quot;draft&quot;\""));
        assert!(!xml.contains("a&b"));
    }

    #[test]
    fn test_playlist_frame_total_matches_track_duration_exactly() {
        let rate = RATE;
        let children = vec![
            gap(7),
            clip(external("a", "/media/a.mp4"), 3, 11),
            gap(13),
            clip(external("b", "/media/b.mp4"), 0, 29),
            clip(external("a", "/media/a.mp4"), 50, 17),
        ];
        let track = video_track(children);
        let expected = track.duration_frames(rate);
        let timeline = timeline(vec![track]);

        let xml = compile(&timeline, &Profile::default()).unwrap();
        let playlist = xml
            .split("<playlist id=\"playlist_video_1\">")
            .nth(1)
            .and_then(|rest| rest.split("</playlist>").next())
            .unwrap();

        let mut total = 0i64;
        for line in playlist.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("<blank length=\"") {
                let length: i64 = rest.split('"').next().unwrap().parse().unwrap();
                total += length;
            } else if line.starts_with("<entry ") {
                let attr = |name: &str| -> i64 {
                    line.split(&format!("{name}=\""))
                        .nth(1)
                        .unwrap()
                        .split('"')
                        .next()
                        .unwrap()
                        .parse()
                        .unwrap()
                };
                total += attr("out") - attr("in") + 1;
            }
        }

        assert_eq!(total, expected);
    }
}
