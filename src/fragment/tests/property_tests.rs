//! Generated round-trip checks across both delivery modes.

use bytes::Bytes;
use proptest::{
    collection::vec,
    prelude::{Just, Strategy, any, prop_oneof},
    prop_assert,
    prop_assert_eq,
    test_runner::{Config as ProptestConfig, RngAlgorithm, TestCaseError, TestRng, TestRunner},
};
use rstest::rstest;

use super::{CAP, chunkifier, config, datagrams};
use crate::{
    LogicalMessage,
    fragment::{Dechunkifier, DeliveryMode},
};

fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

/// Lengths clustered around multiples of the payload cap.
fn part_length_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(0usize),
        (0usize..5).prop_map(|frames| frames * CAP),
        (1usize..5).prop_map(|frames| frames * CAP - 1),
        (0usize..5).prop_map(|frames| frames * CAP + 1),
    ]
}

fn part_strategy() -> impl Strategy<Value = Vec<u8>> {
    part_length_strategy().prop_flat_map(|len| vec(any::<u8>(), len))
}

fn message_strategy() -> impl Strategy<Value = LogicalMessage> {
    let text = part_length_strategy().prop_map(|len| "t".repeat(len));
    (text, vec(part_strategy(), 0..4)).prop_map(|(text, attachments)| {
        LogicalMessage::with_attachments(text, attachments.into_iter().map(Bytes::from).collect())
    })
}

fn expected_frames(message: &LogicalMessage) -> usize {
    let text = message.text().len().div_ceil(CAP).max(1);
    let attachments: usize = message
        .attachments()
        .iter()
        .map(|attachment| attachment.len().div_ceil(CAP).max(1))
        .sum();
    text + attachments
}

#[rstest]
#[case(DeliveryMode::ReliableOrdered, false)]
#[case(DeliveryMode::UnorderedUnreliable, false)]
#[case(DeliveryMode::UnorderedUnreliable, true)]
fn generated_messages_round_trip(#[case] mode: DeliveryMode, #[case] reverse: bool) {
    let mut runner = deterministic_runner(128);

    runner
        .run(&message_strategy(), |message| {
            let sender = chunkifier(mode);
            let mut receiver = Dechunkifier::new(config(), mode);
            let mut frames = datagrams(&sender, &message);

            prop_assert_eq!(frames.len(), expected_frames(&message));
            prop_assert!(
                frames
                    .iter()
                    .all(|frame| frame.len() <= config().max_frame_size.get())
            );

            if reverse {
                frames.reverse();
            }
            let mut delivered = Vec::new();
            for frame in &frames {
                let complete = receiver
                    .push(frame)
                    .map_err(|err| TestCaseError::fail(format!("reassembly failed: {err}")))?;
                delivered.extend(complete);
            }

            prop_assert_eq!(delivered, vec![message]);
            prop_assert_eq!(receiver.buffered_len(), 0);
            Ok(())
        })
        .expect("generated messages should round-trip");
}
