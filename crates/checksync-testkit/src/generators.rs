//! Proptest generators for property-based testing.

use proptest::prelude::*;

/// Generate an item name with no surrounding whitespace.
pub fn item_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]([A-Za-z0-9 .,!?()\\[\\]-]{0,30}[A-Za-z0-9])?".prop_map(String::from)
}

/// Generate leading whitespace for a nested item.
pub fn indent() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), Just("  ".to_string()), Just("\t".to_string())]
}

/// One line of a generated checklist document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSpec {
    Unchecked { indent: String, name: String },
    Checked { indent: String, name: String },
    Heading(String),
    Prose(String),
    Blank,
}

impl LineSpec {
    pub fn render(&self) -> String {
        match self {
            LineSpec::Unchecked { indent, name } => format!("{indent}- [ ] {name}"),
            LineSpec::Checked { indent, name } => format!("{indent}- [x] {name}"),
            LineSpec::Heading(title) => format!("# {title}"),
            LineSpec::Prose(text) => text.clone(),
            LineSpec::Blank => String::new(),
        }
    }

    pub fn is_unchecked(&self) -> bool {
        matches!(self, LineSpec::Unchecked { .. })
    }
}

/// Generate a single line.
pub fn line_spec() -> impl Strategy<Value = LineSpec> {
    prop_oneof![
        3 => (indent(), item_name()).prop_map(|(indent, name)| LineSpec::Unchecked { indent, name }),
        2 => (indent(), item_name()).prop_map(|(indent, name)| LineSpec::Checked { indent, name }),
        1 => item_name().prop_map(LineSpec::Heading),
        2 => "[a-z][a-z ,.]{0,40}".prop_map(LineSpec::Prose),
        1 => Just(LineSpec::Blank),
    ]
}

/// A generated checklist document.
#[derive(Debug, Clone)]
pub struct DocumentSpec {
    pub lines: Vec<LineSpec>,
    pub crlf: bool,
    pub trailing_newline: bool,
}

impl DocumentSpec {
    pub fn render(&self) -> String {
        let terminator = if self.crlf { "\r\n" } else { "\n" };
        let mut text = self
            .lines
            .iter()
            .map(LineSpec::render)
            .collect::<Vec<_>>()
            .join(terminator);
        if self.trailing_newline && !self.lines.is_empty() {
            text.push_str(terminator);
        }
        text
    }

    /// Line numbers and names of the unchecked items, in document order.
    pub fn expected_items(&self) -> Vec<(usize, String)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(line, spec)| match spec {
                LineSpec::Unchecked { name, .. } => Some((line, name.clone())),
                _ => None,
            })
            .collect()
    }
}

impl Arbitrary for DocumentSpec {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(line_spec(), 0..24),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(lines, crlf, trailing_newline)| DocumentSpec {
                lines,
                crlf,
                trailing_newline,
            })
            .boxed()
    }
}

/// Generate a failure plan: how often each protocol message fails before it is acknowledged.
pub fn failure_plan(max_messages: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..4, 0..=max_messages)
}

/// Generate item names for a delivery run.
pub fn item_names(max_items: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(item_name(), 0..=max_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use checksync::{EventOutcome, SyncSession};
    use checksync_core::{extract, DeviceIndex, Document};
    use checksync_device::{Delivery, DeviceEvent, FixedDelay, OutboundMessage};

    use crate::fixtures::{ScriptedChannel, TestFixture};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn test_generated_documents_roundtrip(spec: DocumentSpec) {
            let text = spec.render();
            prop_assert_eq!(Document::load(&text).serialize(), text);
        }

        #[test]
        fn test_extraction_follows_document_order(spec: DocumentSpec) {
            let doc = Document::load(&spec.render());
            let items = extract(&doc);

            for pair in items.windows(2) {
                prop_assert!(pair[0].source_line < pair[1].source_line);
            }
            let found: Vec<(usize, String)> = items
                .iter()
                .map(|item| (item.source_line.get(), item.name.clone()))
                .collect();
            prop_assert_eq!(found, spec.expected_items());
        }

        #[test]
        fn test_checked_lines_are_never_extracted(spec: DocumentSpec) {
            let doc = Document::load(&spec.render());
            for item in extract(&doc) {
                prop_assert!(spec.lines[item.source_line.get()].is_unchecked());
                prop_assert!(!item.checked);
            }
        }

        #[test]
        fn test_device_index_targets_its_source_line(spec in any::<DocumentSpec>(), pick in any::<prop::sample::Index>()) {
            let expected = spec.expected_items();
            prop_assume!(!expected.is_empty());
            let i = pick.index(expected.len());
            let text = spec.render();

            runtime().block_on(async {
                let fixture = TestFixture::new(&text);
                let mut session = fixture.session(TestFixture::quiet_config());
                session.load_and_sync().await.unwrap();
                let line = session.items()[i].source_line;

                // Toggling any other item first does not move item i.
                let other = (i + 1) % expected.len();
                session
                    .on_device_event(DeviceEvent::ItemChecked(other as i64))
                    .await
                    .unwrap();

                let outcome = session
                    .on_device_event(DeviceEvent::ItemChecked(i as i64))
                    .await
                    .unwrap();
                match outcome {
                    EventOutcome::Applied { index, line: target }
                    | EventOutcome::Unchanged { index, line: target } => {
                        assert_eq!(index, DeviceIndex(i as u32));
                        assert_eq!(target, line);
                        assert_eq!(target.get(), expected[i].0);
                    }
                    EventOutcome::Ignored => panic!("toggle ignored"),
                }
            });
        }

        #[test]
        fn test_marking_done_twice_equals_once(spec in any::<DocumentSpec>(), pick in any::<prop::sample::Index>()) {
            let expected = spec.expected_items();
            prop_assume!(!expected.is_empty());
            let i = pick.index(expected.len()) as i64;
            let text = spec.render();

            let (once, twice) = runtime().block_on(async {
                let fixture = TestFixture::new(&text);
                let mut session = fixture.session(TestFixture::quiet_config());
                session.load_and_sync().await.unwrap();

                session.on_device_event(DeviceEvent::ItemChecked(i)).await.unwrap();
                let once = session.document().unwrap().serialize();
                let second = session.on_device_event(DeviceEvent::ItemChecked(i)).await.unwrap();
                assert!(matches!(second, EventOutcome::Unchanged { .. }));
                (once, session.document().unwrap().serialize())
            });
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn test_delivery_is_complete_and_ordered(names in item_names(12), plan in failure_plan(13)) {
            let channel = ScriptedChannel::with_failures(plan.clone());
            let mut delivery = Delivery::new(names.clone()).unwrap();
            let policy = FixedDelay::new(Duration::ZERO);

            let report = runtime()
                .block_on(delivery.run(&channel, &policy, |_| {}))
                .unwrap();

            let mut expected = vec![OutboundMessage::ItemsCount(names.len() as u32)];
            expected.extend(
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| OutboundMessage::item(DeviceIndex(i as u32), name)),
            );
            prop_assert_eq!(channel.protocol_messages(), expected);

            let expected_failures: u32 = plan.iter().take(names.len() + 1).sum();
            prop_assert_eq!(report.failures, expected_failures);
            prop_assert_eq!(report.attempts, names.len() as u32 + 1 + expected_failures);
        }

        #[test]
        fn test_session_delivers_what_was_extracted(spec: DocumentSpec) {
            let text = spec.render();
            let names = runtime().block_on(async {
                let fixture = TestFixture::new(&text);
                let mut session: SyncSession<_, _> = fixture.session(TestFixture::quiet_config());
                session.load_and_sync().await.unwrap();
                fixture.channel.item_names()
            });
            let expected: Vec<String> = spec.expected_items().into_iter().map(|(_, n)| n).collect();
            prop_assert_eq!(names, expected);
        }
    }
}
