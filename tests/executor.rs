mod common;

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use common::{init_tracing, steady_show, ManualTiming, RecordingMedia};
use crossbeam_channel::Receiver;
use leuchtet::nodes::Passthrough;
use leuchtet::{
    ChannelId, ControllerId, Effect, Error, ExecutorConfig, ExecutorEvent, FilterId, FlowData,
    Intent, OutputId, PatchGraph, PlaybackState, SequenceExecutor, SequenceFilter, Show,
    TimingSource,
};

const CHANNEL: ChannelId = ChannelId(0);

fn secs(s: f32) -> Duration {
    Duration::from_secs_f32(s)
}

fn executor_with(clock: &Arc<ManualTiming>) -> SequenceExecutor {
    init_tracing();
    SequenceExecutor::new(ExecutorConfig::default())
        .unwrap()
        .with_default_timing(clock.clone())
}

fn drain(events: &Receiver<ExecutorEvent>) -> Vec<ExecutorEvent> {
    events.try_iter().collect()
}

fn count_ended(events: &[ExecutorEvent]) -> usize {
    events.iter().filter(|e| e.is_ended()).count()
}

fn patched_graph() -> (PatchGraph, OutputId) {
    let output = OutputId::new(ControllerId(0), 0);
    let mut graph = PatchGraph::new();
    graph.register_channel(CHANNEL).unwrap();
    graph.add_filter(FilterId(0), Passthrough::default()).unwrap();
    graph.register_output(output).unwrap();
    graph.connect(CHANNEL, 0, FilterId(0), 0).unwrap();
    graph.connect(FilterId(0), 0, output, 0).unwrap();
    (graph, output)
}

#[test]
fn play_without_sequence_does_nothing() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let events = executor.subscribe();

    executor.play(Duration::ZERO, secs(5.0));
    executor.start();

    assert_eq!(executor.state(), PlaybackState::Idle);
    assert!(drain(&events).is_empty());
    assert!(!clock.is_running());
}

#[test]
fn play_while_running_is_ignored() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let events = executor.subscribe();
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));

    executor.play(secs(1.0), secs(4.0));
    executor.play(secs(2.0), secs(8.0));

    assert!(executor.is_running());
    assert_eq!(executor.start_time(), secs(1.0));
    assert_eq!(executor.end_time(), secs(4.0));
    assert_eq!(clock.position(), secs(1.0));

    let events = drain(&events);
    assert_eq!(events.len(), 1);
    match &events[0] {
        ExecutorEvent::Started { sequence, start, end, .. } => {
            assert_eq!(sequence.name(), "Steady");
            assert_eq!(*start, secs(1.0));
            assert_eq!(*end, secs(4.0));
        }
        other => panic!("expected Started, got {:?}", other),
    }
}

#[test]
fn start_and_end_are_clamped_to_length() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));

    executor.start();
    assert_eq!(executor.start_time(), Duration::ZERO);
    assert_eq!(executor.end_time(), secs(10.0));
    assert!(executor.is_timed());
    executor.stop();

    executor.play(secs(30.0), secs(40.0));
    assert_eq!(executor.start_time(), secs(10.0));
    assert_eq!(executor.end_time(), secs(10.0));
    assert!(executor.is_timed());
}

#[test]
fn run_clamped_to_its_end_stops_at_once() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let events = executor.subscribe();
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));

    executor.play(secs(12.0), secs(20.0));
    assert_eq!(executor.state(), PlaybackState::Idle);
    assert!(!clock.is_running());

    executor.wait_for_requests(Duration::from_millis(40));
    let seen = drain(&events);
    assert_eq!(seen.iter().filter(|e| e.is_started()).count(), 1);
    assert_eq!(count_ended(&seen), 1);

    // A zero-length show ends as soon as it starts
    executor.set_sequence(Some(Arc::new(Show::new("Empty", Duration::ZERO))));
    executor.start();
    assert_eq!(executor.state(), PlaybackState::Idle);
    executor.wait_for_requests(Duration::from_millis(40));
    assert_eq!(count_ended(&drain(&events)), 1);
}

#[test]
fn pause_and_resume_keep_position() {
    let clock = ManualTiming::new();
    let media = RecordingMedia::new("Soundtrack");
    let mut executor = executor_with(&clock);
    let show = steady_show(secs(10.0), CHANNEL).with_media(media.clone());
    executor.set_sequence(Some(Arc::new(show)));

    executor.play(Duration::ZERO, secs(10.0));
    clock.advance(secs(2.0));

    executor.pause();
    assert!(executor.is_paused());
    clock.advance(secs(3.0));
    assert_eq!(executor.position(), Some(secs(2.0)));

    // Pausing twice changes nothing
    executor.pause();
    assert!(executor.is_paused());

    executor.resume();
    assert!(executor.is_running());
    assert_eq!(executor.position(), Some(secs(2.0)));
    clock.advance(secs(1.0));
    assert_eq!(executor.position(), Some(secs(3.0)));

    executor.stop();
    assert_eq!(media.calls(), vec!["load 0ms", "start", "pause", "resume", "stop"]);
}

#[test]
fn resume_requires_pause() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let events = executor.subscribe();
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));

    executor.resume();
    assert_eq!(executor.state(), PlaybackState::Idle);

    executor.play(Duration::ZERO, secs(10.0));
    executor.resume();
    assert!(executor.is_running());
    assert_eq!(drain(&events).len(), 1);
}

#[test]
fn natural_end_stops_exactly_once() {
    let clock = ManualTiming::new();
    let media = RecordingMedia::new("Soundtrack");
    let mut executor = executor_with(&clock);
    let events = executor.subscribe();
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL).with_media(media.clone()))));

    executor.play(Duration::ZERO, secs(5.0));
    clock.set_position(secs(6.0));

    assert!(executor.wait_for_requests(Duration::from_secs(2)) >= 1);
    assert_eq!(executor.state(), PlaybackState::Idle);
    assert!(!clock.is_running());

    // A late explicit stop is a no-op
    executor.stop();
    sleep(Duration::from_millis(50));
    executor.process_requests();

    let events = drain(&events);
    assert_eq!(events.iter().filter(|e| e.is_started()).count(), 1);
    assert_eq!(count_ended(&events), 1);
    assert_eq!(media.calls().last().map(String::as_str), Some("stop"));
}

#[test]
fn explicit_stop_racing_natural_end_ends_once() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let events = executor.subscribe();
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));

    for _ in 0..5 {
        executor.play(Duration::ZERO, secs(5.0));
        clock.set_position(secs(5.0));
        // Give the checker a chance to queue its request first
        sleep(Duration::from_millis(15));
        executor.stop();
        executor.wait_for_requests(Duration::from_millis(30));
        assert_eq!(executor.state(), PlaybackState::Idle);
    }

    assert_eq!(count_ended(&drain(&events)), 5);
}

#[test]
fn stale_stop_request_does_not_end_next_run() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));

    executor.play(Duration::ZERO, secs(5.0));
    clock.set_position(secs(7.0));
    sleep(Duration::from_millis(60));
    executor.stop();

    executor.play(Duration::ZERO, secs(5.0));
    executor.process_requests();
    assert!(executor.is_running());
    assert_eq!(clock.position(), Duration::ZERO);
}

#[test]
fn untimed_runs_never_stop_on_their_own() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));

    executor.play(secs(6.0), secs(2.0));
    assert!(!executor.is_timed());
    clock.set_position(secs(20.0));
    assert_eq!(executor.wait_for_requests(Duration::from_millis(60)), 0);
    assert!(executor.is_running());
}

#[test]
fn partial_run_never_delivers_past_its_end() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let events = executor.subscribe();
    let (mut graph, output) = patched_graph();
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));

    executor.play(Duration::ZERO, secs(5.0));

    let mut delivered = Vec::new();
    for position in [0.0, 1.0, 2.5, 4.9, 5.0, 5.2, 7.0, 9.5] {
        clock.set_position(secs(position));
        if let Some(frame) = executor.tick(&mut graph) {
            assert_eq!(frame.get(output), Some(&FlowData::Intents(vec![Intent::level(1.0)])));
            delivered.push(frame.position());
        }
    }
    executor.wait_for_requests(Duration::from_millis(30));

    assert_eq!(delivered, vec![secs(0.0), secs(1.0), secs(2.5), secs(4.9)]);
    assert!(delivered.iter().all(|p| *p < secs(5.0)));
    assert_eq!(executor.state(), PlaybackState::Idle);
    assert_eq!(count_ended(&drain(&events)), 1);
}

#[test]
fn tick_is_idle_without_run() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let (mut graph, _) = patched_graph();
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));

    assert!(executor.tick(&mut graph).is_none());
}

struct HalfLevel;

impl SequenceFilter for HalfLevel {
    fn name(&self) -> &str {
        "Half level"
    }

    fn apply(&self, _channel: ChannelId, _position: Duration, intents: Vec<Intent>) -> Vec<Intent> {
        intents
            .into_iter()
            .map(|i| Intent::rgb(i.red / 2.0, i.green / 2.0, i.blue / 2.0))
            .collect()
    }
}

#[test]
fn sequence_filters_shape_channel_data() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let (mut graph, output) = patched_graph();
    let show = steady_show(secs(10.0), CHANNEL).with_sequence_filter(Arc::new(HalfLevel));
    executor.set_sequence(Some(Arc::new(show)));

    executor.start();
    assert_eq!(executor.sequence_filters().len(), 1);

    let frame = executor.tick(&mut graph).unwrap();
    assert_eq!(frame.get(output), Some(&FlowData::Intents(vec![Intent::level(0.5)])));
}

#[test]
fn media_failures_are_reported_not_fatal() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let events = executor.subscribe();
    let show = steady_show(secs(10.0), CHANNEL).with_media(RecordingMedia::failing("Missing.ogg"));
    executor.set_sequence(Some(Arc::new(show)));

    executor.start();
    assert!(executor.is_running());

    let events = drain(&events);
    let errors: Vec<&String> = events
        .iter()
        .filter_map(|e| match e {
            ExecutorEvent::Error(text) => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec!["Missing.ogg: file not found"]);
    assert_eq!(events.iter().filter(|e| e.is_started()).count(), 1);
}

#[test]
fn preferred_clock_wins_over_default() {
    let default_clock = ManualTiming::new();
    let show_clock = ManualTiming::new();
    let mut executor = executor_with(&default_clock);
    let show = steady_show(secs(10.0), CHANNEL).with_timing(show_clock.clone());
    executor.set_sequence(Some(Arc::new(show)));

    executor.play(secs(3.0), secs(10.0));

    assert!(show_clock.is_running());
    assert!(!default_clock.is_running());
    assert_eq!(show_clock.position(), secs(3.0));
    assert_eq!(executor.name(), Some("Steady"));
}

#[test]
fn live_data_is_consumed_while_playing() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let show = Arc::new(Show::new("Live", secs(10.0)));
    executor.set_sequence(Some(show.clone()));
    let effect = Effect::new(CHANNEL, Duration::ZERO, secs(1.0), Intent::level(1.0));

    executor.start();
    assert_eq!(show.listener_count(), 1);
    assert!(!show.insert_effect(effect));

    executor.stop();
    assert_eq!(show.listener_count(), 0);
    assert!(show.insert_effect(effect));
    assert_eq!(show.effects(), vec![effect]);
}

#[test]
fn dispose_is_repeatable() {
    let clock = ManualTiming::new();
    let mut executor = executor_with(&clock);
    let events = executor.subscribe();
    executor.set_sequence(Some(Arc::new(steady_show(secs(10.0), CHANNEL))));
    executor.start();

    executor.dispose();
    executor.dispose();
    assert_eq!(executor.state(), PlaybackState::Idle);
    assert!(!clock.is_running());
    drop(executor);

    assert_eq!(count_ended(&drain(&events)), 1);
}

#[test]
fn invalid_config_is_rejected() {
    let config = ExecutorConfig::default().with_end_check_interval(Duration::ZERO);
    assert!(matches!(SequenceExecutor::new(config), Err(Error::InvalidConfig(_))));
}
