//! Rule scheduler — fires rule effects on time and in reaction to events.
//!
//! Time-based rules wait in a queue ordered by their next execution time.
//! A dedicated worker thread sleeps until the head is due, fires it, computes
//! its following execution time and requeues it while that time lies in the
//! future. Rule edits and device property changes arrive through
//! [`EventHandler::handle_event`] and are evaluated synchronously on the
//! dispatching thread.
//!
//! Effect failures, and panics, are logged and never leave the scheduler.

mod queue;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::TimeDelta;

use hearth_domain::dispatch::DispatchResult;
use hearth_domain::error::HearthError;
use hearth_domain::event::{Event, RuleChangeEvent, RuleFields};
use hearth_domain::id::{RuleId, UserId};
use hearth_domain::rule::{EvaluationContext, Rule};
use hearth_domain::time::{self, Timestamp};

use crate::event_bus::EventHandler;
use crate::executor::ActionExecutor;
use crate::ports::{RegistryDeviceState, RuleFilter, RuleStore};

use self::queue::TimedQueue;

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

#[derive(Default)]
struct State {
    queue: TimedQueue,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
    executor: ActionExecutor,
    rules: Arc<dyn RuleStore>,
    clock: Clock,
}

/// Owns the time-ordered rule queue and its worker thread.
pub struct RuleScheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RuleScheduler {
    #[must_use]
    pub fn new(executor: ActionExecutor, rules: Arc<dyn RuleStore>) -> Self {
        Self::with_clock(executor, rules, Arc::new(time::now))
    }

    #[must_use]
    pub fn with_clock(executor: ActionExecutor, rules: Arc<dyn RuleStore>, clock: Clock) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                wake: Condvar::new(),
                executor,
                rules,
                clock,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Replace the queue with every enabled time-based rule of the store.
    ///
    /// Returns the number of queued rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule store cannot be read.
    pub fn load(&self) -> Result<usize, HearthError> {
        let rules = self
            .shared
            .rules
            .get_all_rules(&RuleFilter::enabled(), UserId::SYSTEM)?;
        let now = self.shared.now();
        let mut state = self.shared.lock();
        state.queue.clear();
        for rule in rules.into_iter().filter(Rule::is_time_based) {
            if let Some(next) = rule.next_execution_time(now) {
                state.queue.upsert(next, rule);
            }
        }
        let queued = state.queue.len();
        drop(state);
        self.shared.wake.notify_all();
        tracing::info!(queued, "loaded time based rules");
        Ok(queued)
    }

    /// Load the rules and spawn the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule store cannot be read or the thread cannot
    /// be spawned.
    pub fn start(&self) -> Result<(), HearthError> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            tracing::warn!("rule scheduler already started");
            return Ok(());
        }
        self.load()?;
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("rule-scheduler".to_string())
            .spawn(move || shared.run())?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stop the worker thread and wait for it. Safe to call repeatedly, or
    /// without [`start`](Self::start).
    pub fn shutdown(&self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();

        let Some(handle) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::error!("rule scheduler thread panicked");
        }
        tracing::info!("rule scheduler stopped");
    }

    /// Fire every queued rule due at the current time.
    ///
    /// The worker does this on its own; calling it directly is only useful
    /// when no worker runs. Returns the number of rules taken from the queue.
    pub fn run_due(&self) -> usize {
        let now = self.shared.now();
        let (guard, fired) = self.shared.fire_due(self.shared.lock(), now);
        drop(guard);
        fired
    }

    /// Time the worker waits for, if any rule is queued.
    #[must_use]
    pub fn next_wake(&self) -> Option<Timestamp> {
        self.shared.lock().queue.peek_time()
    }

    /// Queued rule ids, earliest first.
    #[must_use]
    pub fn queued(&self) -> Vec<RuleId> {
        self.shared.lock().queue.ids()
    }

    #[must_use]
    pub fn is_queued(&self, id: RuleId) -> bool {
        self.shared.lock().queue.contains(id)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for RuleScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl EventHandler for RuleScheduler {
    fn handle_event(&self, event: &Event) -> DispatchResult {
        let mut result = DispatchResult::NOT_HANDLED;
        if let Event::RuleChange(change) = event {
            result |= self.shared.on_rule_change(change);
        }
        if matches!(event, Event::RuleChange(_) | Event::DevicePropertyChange(_)) {
            result |= self.shared.check_rules(event);
        }
        result
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> Timestamp {
        (self.clock)()
    }

    fn run(&self) {
        tracing::debug!("rule scheduler started");
        let mut state = self.lock();
        while !state.shutdown {
            let now = self.now();
            state = self.fire_due(state, now).0;
            if state.shutdown {
                break;
            }
            state = match state.queue.peek_time() {
                Some(next) => {
                    let wait = (next - self.now()).to_std().unwrap_or_default();
                    tracing::debug!(%next, ?wait, "waiting for next time based rule");
                    self.wake
                        .wait_timeout(state, wait)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => {
                    tracing::debug!("no time based rules queued, idling");
                    self.wake
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner)
                }
            };
        }
        tracing::debug!("rule scheduler loop exited");
    }

    /// Pop and fire due rules; the lock is released while an effect runs.
    fn fire_due<'a>(
        &'a self,
        mut state: MutexGuard<'a, State>,
        now: Timestamp,
    ) -> (MutexGuard<'a, State>, usize) {
        let mut fired = 0;
        while !state.shutdown {
            let Some(rule) = state.queue.pop_due(now) else {
                break;
            };
            fired += 1;
            let following = now
                .checked_add_signed(TimeDelta::seconds(1))
                .and_then(|after| rule.next_execution_time(after))
                .filter(|next| *next > now);
            match following {
                Some(next) => {
                    state.queue.upsert(next, rule.clone());
                }
                None => tracing::debug!(rule_id = %rule.id, "time based rule has no future execution, dropping"),
            }
            drop(state);

            let devices = RegistryDeviceState::new(self.executor.devices().as_ref(), UserId::SYSTEM);
            let ctx = EvaluationContext {
                now,
                devices: &devices,
            };
            if rule.is_satisfied(&ctx) {
                self.execute_effect(&rule, UserId::SYSTEM);
            } else {
                tracing::warn!(
                    rule_id = %rule.id,
                    %now,
                    "due time based rule not satisfied, firing missed"
                );
            }
            state = self.lock();
        }
        (state, fired)
    }

    #[tracing::instrument(skip(self, change), fields(rule_id = %change.changed.id, changed = ?change.changed_fields))]
    fn on_rule_change(&self, change: &RuleChangeEvent) -> DispatchResult {
        let rule = &change.changed;
        match change.changed_fields {
            RuleFields::Remove => self.dequeue(rule.id),
            RuleFields::Condition => {
                let devices =
                    RegistryDeviceState::new(self.executor.devices().as_ref(), UserId::SYSTEM);
                let ctx = EvaluationContext {
                    now: self.now(),
                    devices: &devices,
                };
                if rule.is_satisfied(&ctx) {
                    self.execute_effect(rule, change.user.unwrap_or(UserId::SYSTEM));
                }
                self.reschedule(rule);
            }
            _ => self.reschedule(rule),
        }
        DispatchResult::HANDLED
    }

    /// Queue `rule` at its next execution time, or drop it from the queue
    /// when it is disabled, not time-based or has no future execution.
    fn reschedule(&self, rule: &Rule) {
        let next = if rule.enabled && rule.is_time_based() {
            rule.next_execution_time(self.now())
        } else {
            None
        };
        let mut state = self.lock();
        let head_changed = match next {
            Some(next) => state.queue.upsert(next, rule.clone()),
            None => state.queue.remove(rule.id),
        };
        drop(state);
        if head_changed {
            self.wake.notify_all();
        }
    }

    fn dequeue(&self, id: RuleId) {
        let head_changed = self.lock().queue.remove(id);
        if head_changed {
            self.wake.notify_all();
        }
    }

    /// Evaluate every enabled rule against `event` and fire the satisfied ones.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type()))]
    fn check_rules(&self, event: &Event) -> DispatchResult {
        let rules = match self.rules.get_all_rules(&RuleFilter::enabled(), UserId::SYSTEM) {
            Ok(rules) => rules,
            Err(err) => {
                tracing::error!(error = %err, "failed to load rules");
                return DispatchResult::ERROR;
            }
        };

        let user = acting_user(event);
        let event_type = event.event_type();
        let devices = RegistryDeviceState::new(self.executor.devices().as_ref(), user);
        let ctx = EvaluationContext {
            now: self.now(),
            devices: &devices,
        };

        let mut result = DispatchResult::NOT_HANDLED;
        for rule in &rules {
            let Some(condition) = &rule.condition else {
                tracing::error!(rule_id = %rule.id, "rule has no condition");
                continue;
            };
            if condition.should_execute_on(event_type)
                && condition.is_satisfied_after_event(event, &ctx)
            {
                self.execute_effect(rule, user);
                result |= DispatchResult::HANDLED;
            }
        }
        result
    }

    fn execute_effect(&self, rule: &Rule, user: UserId) {
        tracing::debug!(rule_id = %rule.id, "executing rule effect");
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.executor.execute(&rule.effect, user, 0)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(rule_id = %rule.id, error = %err, "rule effect failed");
            }
            Err(_) => tracing::error!(rule_id = %rule.id, "rule effect panicked"),
        }
    }
}

fn acting_user(event: &Event) -> UserId {
    let user = match event {
        Event::ActionChange(change) => change.user,
        Event::RuleChange(change) => change.user,
        Event::DeviceChange(change) => change.user,
        Event::DevicePropertyChange(change) => change.user,
        Event::Error(_) => None,
    };
    user.unwrap_or(UserId::SYSTEM)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use hearth_domain::action::{Action, SubActionImpl};
    use hearth_domain::device::{Device, Property, PropertyAccess};
    use hearth_domain::event::ChangeEvent;
    use hearth_domain::id::DeviceId;
    use hearth_domain::rule::{
        Condition, DeviceCondition, NumericCompare, TimeCondition, TimeKind,
    };

    use super::*;
    use crate::executor::tests::{FakeActions, FakeDevices, ManualDelays, RecordingNotifier, lamp};

    // ── Fakes ─────────────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeRules {
        rules: Mutex<BTreeMap<RuleId, Rule>>,
    }

    impl FakeRules {
        fn put(&self, rule: Rule) {
            self.rules.lock().unwrap().insert(rule.id, rule);
        }

        fn take(&self, id: RuleId) -> Rule {
            self.rules.lock().unwrap().remove(&id).unwrap()
        }
    }

    impl RuleStore for FakeRules {
        fn get_all_rules(
            &self,
            filter: &RuleFilter,
            _: UserId,
        ) -> Result<Vec<Rule>, HearthError> {
            Ok(self
                .rules
                .lock()
                .unwrap()
                .values()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect())
        }
    }

    struct FakeClock(Mutex<Timestamp>);

    impl FakeClock {
        fn set(&self, now: Timestamp) {
            *self.0.lock().unwrap() = now;
        }
    }

    struct Harness {
        rules: Arc<FakeRules>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<FakeClock>,
        scheduler: RuleScheduler,
    }

    fn noon() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap()
    }

    fn harness() -> Harness {
        let rules = Arc::new(FakeRules::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let executor = ActionExecutor::new(
            Arc::new(FakeActions::default()),
            notifier.clone(),
            Arc::new(FakeDevices::with([lamp()])),
            Arc::new(ManualDelays::default()),
        );
        let clock = Arc::new(FakeClock(Mutex::new(noon())));
        let source = Arc::clone(&clock);
        let scheduler = RuleScheduler::with_clock(
            executor,
            rules.clone(),
            Arc::new(move || *source.0.lock().unwrap()),
        );
        Harness {
            rules,
            notifier,
            clock,
            scheduler,
        }
    }

    fn notify(message: &str) -> Action {
        Action::builder()
            .name("notify")
            .sub_action(SubActionImpl::notification(0, message))
            .build()
    }

    fn at_time_of_day(id: u64, seconds: i64, message: &str) -> Rule {
        Rule::builder()
            .id(RuleId::new(id))
            .name(format!("rule {id}"))
            .condition(Condition::Time(TimeCondition::new(
                TimeKind::HourMinSec,
                NumericCompare::Equals,
                seconds,
                0,
            )))
            .effect(notify(message))
            .build()
            .unwrap()
    }

    fn lamp_on_rule(id: u64) -> Rule {
        Rule::builder()
            .id(RuleId::new(id))
            .name("lamp on")
            .condition(Condition::Device(DeviceCondition {
                device_id: DeviceId::new(1),
                property: "level".to_string(),
                value1: 10,
                value2: 0,
                compare: NumericCompare::Greater,
            }))
            .effect(notify("lamp bright"))
            .build()
            .unwrap()
    }

    fn messages(h: &Harness) -> Vec<String> {
        h.notifier
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|p| p["notification"]["message"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn rule_change(rule: Rule, fields: RuleFields) -> Event {
        Event::RuleChange(ChangeEvent::new(None, rule, fields, None))
    }

    fn level_change(level: i64) -> Event {
        let mut device: Device = lamp();
        device
            .properties
            .insert("level".to_string(), Property::new(level, PropertyAccess::FULL));
        Event::DevicePropertyChange(ChangeEvent::new(None, device, "level".to_string(), None))
    }

    // ── Time-based firing ─────────────────────────────────────────────

    #[test]
    fn should_queue_only_enabled_time_based_rules_when_loading() {
        let h = harness();
        h.rules.put(at_time_of_day(1, 13 * 3600, "one"));
        h.rules.put(lamp_on_rule(2));
        let mut disabled = at_time_of_day(3, 14 * 3600, "three");
        disabled.enabled = false;
        h.rules.put(disabled);

        assert_eq!(h.scheduler.load().unwrap(), 1);
        assert_eq!(h.scheduler.queued(), vec![RuleId::new(1)]);
    }

    #[test]
    fn should_fire_earlier_rule_first_and_requeue_it() {
        let h = harness();
        h.rules.put(at_time_of_day(1, 13 * 3600, "t1"));
        h.rules.put(at_time_of_day(2, 14 * 3600, "t2"));
        h.scheduler.load().unwrap();

        h.clock.set(noon() + TimeDelta::hours(1));
        assert_eq!(h.scheduler.run_due(), 1);
        assert_eq!(messages(&h), vec!["t1"]);

        // t1 now waits for tomorrow, after t2
        assert_eq!(h.scheduler.queued(), vec![RuleId::new(2), RuleId::new(1)]);
        assert_eq!(h.scheduler.next_wake(), Some(noon() + TimeDelta::hours(2)));

        h.clock.set(noon() + TimeDelta::hours(2));
        h.scheduler.run_due();
        assert_eq!(messages(&h), vec!["t1", "t2"]);
    }

    #[test]
    fn should_not_fire_before_due_time() {
        let h = harness();
        h.rules.put(at_time_of_day(1, 13 * 3600, "later"));
        h.scheduler.load().unwrap();

        assert_eq!(h.scheduler.run_due(), 0);
        assert!(messages(&h).is_empty());
    }

    #[test]
    fn should_drop_one_shot_rule_after_firing() {
        let h = harness();
        let rule = Rule::builder()
            .id(RuleId::new(1))
            .name("once")
            .condition(Condition::Time(TimeCondition::at(noon() + TimeDelta::minutes(5))))
            .effect(notify("once"))
            .build()
            .unwrap();
        h.rules.put(rule);
        h.scheduler.load().unwrap();

        h.clock.set(noon() + TimeDelta::minutes(5));
        h.scheduler.run_due();

        assert_eq!(messages(&h), vec!["once"]);
        assert!(h.scheduler.queued().is_empty());
        assert_eq!(h.scheduler.next_wake(), None);
    }

    #[test]
    fn should_skip_effect_when_due_rule_is_not_satisfied() {
        let h = harness();
        let rule = Rule::builder()
            .id(RuleId::new(1))
            .name("guarded")
            .condition(Condition::compare(
                Condition::Time(TimeCondition::new(
                    TimeKind::HourMinSec,
                    NumericCompare::Equals,
                    13 * 3600,
                    0,
                )),
                hearth_domain::rule::LogicOperator::And,
                Condition::Constant { state: false },
            ))
            .effect(notify("never"))
            .build()
            .unwrap();
        h.rules.put(rule);
        h.scheduler.load().unwrap();

        h.clock.set(noon() + TimeDelta::hours(1));
        assert_eq!(h.scheduler.run_due(), 1);
        assert!(messages(&h).is_empty());
        assert_eq!(h.scheduler.queued(), vec![RuleId::new(1)]);
    }

    // ── Rule changes ──────────────────────────────────────────────────

    #[test]
    fn should_move_wait_target_when_head_rule_is_removed() {
        let h = harness();
        h.rules.put(at_time_of_day(1, 13 * 3600, "t1"));
        h.rules.put(at_time_of_day(2, 14 * 3600, "t2"));
        h.scheduler.load().unwrap();

        h.scheduler
            .handle_event(&rule_change(at_time_of_day(1, 13 * 3600, "t1"), RuleFields::Remove));

        assert_eq!(h.scheduler.next_wake(), Some(noon() + TimeDelta::hours(2)));

        h.scheduler
            .handle_event(&rule_change(at_time_of_day(2, 14 * 3600, "t2"), RuleFields::Remove));
        assert_eq!(h.scheduler.next_wake(), None);
    }

    #[test]
    fn should_queue_time_based_rule_when_added() {
        let h = harness();
        let rule = at_time_of_day(4, 12 * 3600 + 30 * 60, "added");

        let result = h.scheduler.handle_event(&rule_change(rule, RuleFields::Add));

        assert!(result.is_handled());
        assert_eq!(h.scheduler.next_wake(), Some(noon() + TimeDelta::minutes(30)));
    }

    #[test]
    fn should_replace_queued_rule_when_time_changes() {
        let h = harness();
        h.rules.put(at_time_of_day(1, 13 * 3600, "t1"));
        h.scheduler.load().unwrap();

        let moved = at_time_of_day(1, 15 * 3600, "t1");
        h.scheduler.handle_event(&rule_change(moved, RuleFields::Condition));

        assert_eq!(h.scheduler.queued(), vec![RuleId::new(1)]);
        assert_eq!(h.scheduler.next_wake(), Some(noon() + TimeDelta::hours(3)));
    }

    #[test]
    fn should_unqueue_rule_when_it_gets_disabled() {
        let h = harness();
        h.rules.put(at_time_of_day(1, 13 * 3600, "t1"));
        h.scheduler.load().unwrap();

        let mut disabled = at_time_of_day(1, 13 * 3600, "t1");
        disabled.enabled = false;
        h.scheduler.handle_event(&rule_change(disabled, RuleFields::Enabled));

        assert!(h.scheduler.queued().is_empty());
    }

    #[test]
    fn should_execute_immediately_when_edited_condition_is_satisfied() {
        let h = harness();
        let rule = Rule::builder()
            .id(RuleId::new(1))
            .name("always")
            .condition(Condition::Constant { state: true })
            .effect(notify("edited"))
            .enabled(false)
            .build()
            .unwrap();
        // disabled in the store so the rescan does not fire it again
        h.rules.put(rule.clone());
        let mut edited = rule;
        edited.enabled = true;

        h.scheduler.handle_event(&rule_change(edited, RuleFields::Condition));

        assert_eq!(messages(&h), vec!["edited"]);
    }

    // ── Event-driven firing ───────────────────────────────────────────

    #[test]
    fn should_fire_rule_when_property_change_satisfies_condition() {
        let h = harness();
        h.rules.put(lamp_on_rule(1));

        let result = h.scheduler.handle_event(&level_change(20));

        assert!(result.is_handled());
        assert_eq!(messages(&h), vec!["lamp bright"]);
    }

    #[test]
    fn should_not_fire_rule_when_property_change_does_not_satisfy_condition() {
        let h = harness();
        h.rules.put(lamp_on_rule(1));

        let result = h.scheduler.handle_event(&level_change(3));

        assert!(!result.is_handled());
        assert!(messages(&h).is_empty());
    }

    #[test]
    fn should_ignore_disabled_rules_when_checking_events() {
        let h = harness();
        let mut rule = lamp_on_rule(1);
        rule.enabled = false;
        h.rules.put(rule);

        h.scheduler.handle_event(&level_change(20));

        assert!(messages(&h).is_empty());
    }

    #[test]
    fn should_keep_checking_rules_when_one_effect_fails() {
        let h = harness();
        let mut failing = lamp_on_rule(1);
        failing.effect = Action::builder()
            .name("broken")
            .sub_action(SubActionImpl::device_set(DeviceId::new(99), "on", true))
            .build();
        h.rules.put(failing);
        h.rules.put(lamp_on_rule(2));

        h.scheduler.handle_event(&level_change(20));

        assert_eq!(messages(&h), vec!["lamp bright"]);
    }

    #[test]
    fn should_skip_rules_without_condition() {
        let h = harness();
        let mut draft = lamp_on_rule(1);
        draft.condition = None;
        h.rules.put(draft);

        let result = h.scheduler.handle_event(&level_change(20));

        assert!(!result.is_handled());
    }

    #[test]
    fn should_ignore_unrelated_events() {
        let h = harness();
        h.rules.put(
            Rule::builder()
                .id(RuleId::new(1))
                .name("always")
                .condition(Condition::Constant { state: true })
                .effect(notify("x"))
                .build()
                .unwrap(),
        );

        let result = h.scheduler.handle_event(&Event::error("boom", "tests"));

        assert!(!result.is_handled());
        assert!(messages(&h).is_empty());
    }

    // ── Worker lifecycle ──────────────────────────────────────────────

    #[test]
    fn should_shutdown_without_start() {
        let h = harness();
        h.scheduler.shutdown();
        h.scheduler.shutdown();
        assert!(!h.scheduler.is_running());
    }

    #[test]
    fn should_stop_worker_on_shutdown() {
        let h = harness();
        h.scheduler.start().unwrap();
        assert!(h.scheduler.is_running());

        h.scheduler.shutdown();

        assert!(!h.scheduler.is_running());
    }

    fn one_shot(id: u64, at: Timestamp, message: &str) -> Rule {
        Rule::builder()
            .id(RuleId::new(id))
            .name(message)
            .condition(Condition::Time(TimeCondition::at(at)))
            .effect(notify(message))
            .build()
            .unwrap()
    }

    fn wait_for_messages(h: &Harness, count: usize) {
        let mut waited = Duration::ZERO;
        while messages(h).len() < count && waited < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(50));
            waited += Duration::from_millis(50);
        }
    }

    #[test]
    fn should_retarget_worker_when_head_rule_is_removed() {
        let h = harness();
        let a_at = noon() + TimeDelta::seconds(1);
        let b_at = noon() + TimeDelta::seconds(2);
        h.rules.put(one_shot(1, a_at, "a"));
        h.rules.put(one_shot(2, b_at, "b"));
        h.scheduler.start().unwrap();
        assert_eq!(h.scheduler.next_wake(), Some(a_at));

        let removed = h.rules.take(RuleId::new(1));
        h.scheduler.handle_event(&rule_change(removed, RuleFields::Remove));
        assert_eq!(h.scheduler.next_wake(), Some(b_at));

        // past the removed rule's time, exactly at the remaining one
        h.clock.set(b_at);
        wait_for_messages(&h, 1);
        h.scheduler.shutdown();

        assert_eq!(messages(&h), vec!["b"]);
        assert!(h.scheduler.queued().is_empty());
    }

    #[test]
    fn should_fire_due_rule_from_worker_thread() {
        let rules = Arc::new(FakeRules::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let executor = ActionExecutor::new(
            Arc::new(FakeActions::default()),
            notifier.clone(),
            Arc::new(FakeDevices::default()),
            Arc::new(ManualDelays::default()),
        );
        let scheduler = RuleScheduler::new(executor, rules.clone());
        scheduler.start().unwrap();

        let soon = time::now() + TimeDelta::seconds(1);
        let rule = Rule::builder()
            .id(RuleId::new(1))
            .name("soon")
            .condition(Condition::Time(TimeCondition::at(soon)))
            .effect(notify("woke"))
            .build()
            .unwrap();
        scheduler.handle_event(&rule_change(rule, RuleFields::Add));

        let mut waited = Duration::ZERO;
        while notifier.sent.lock().unwrap().is_empty() && waited < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(50));
            waited += Duration::from_millis(50);
        }
        scheduler.shutdown();

        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }
}
