mod common;

use common::*;
use hfpag_core::{CallInfo, HfpCallState};
use hfpag_events::{AgMsg, AtResponse, StackEventData, SystemActivity, TimerKind};

fn dialled_numbers(events: &[ServiceEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ServiceEvent::Activity(SystemActivity::DialCall { number }) => Some(number.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_dial_number_confirmed_by_telephony() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.drain_records();

    test.stack(StackEventData::DialCall {
        number: "06-1234 567;".to_string(),
    });
    assert_eq!(dialled_numbers(&test.service.events()), vec!["061234567".to_string()]);
    let snapshot = test.machine.snapshot();
    assert!(snapshot.dialing_out);
    assert!(test.machine.timer_armed(TimerKind::DialingOutTimeout));
    // The peer is promoted so the upcoming call routes to it
    assert_eq!(test.service.active_device_now(), Some(peer()));

    // Telephony starts dialling: the pending ATD gets its OK
    test.send(AgMsg::CallStateChanged {
        call: CallInfo::new(0, 0, HfpCallState::Dialing),
        is_virtual: false,
    });
    assert!(test
        .native
        .calls()
        .contains(&NativeCall::AtResponseCode(peer(), AtResponse::Ok, 0)));
    assert!(!test.machine.timer_armed(TimerKind::DialingOutTimeout));

    // Call goes active: the dial-out window closes
    test.send(AgMsg::CallStateChanged {
        call: CallInfo::new(1, 0, HfpCallState::Active),
        is_virtual: false,
    });
    assert!(!test.machine.snapshot().dialing_out);
}

#[test]
fn test_second_dial_rejected_while_pending() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.stack(StackEventData::DialCall {
        number: "0611111".to_string(),
    });
    test.drain_records();

    test.stack(StackEventData::DialCall {
        number: "0622222".to_string(),
    });
    assert!(test
        .native
        .calls()
        .contains(&NativeCall::AtResponseCode(peer(), AtResponse::Error, 0)));
    assert!(dialled_numbers(&test.service.events()).is_empty());
}

#[test]
fn test_memory_dial_uses_last_dialled() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.phonebook.set_last_dialled(Some("0655555"));
    test.drain_records();

    test.stack(StackEventData::DialCall {
        number: ">1".to_string(),
    });
    assert_eq!(dialled_numbers(&test.service.events()), vec!["0655555".to_string()]);
}

#[test]
fn test_pts_memory_marker_errors() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.phonebook.set_last_dialled(Some("0655555"));
    test.drain_records();

    test.stack(StackEventData::DialCall {
        number: ">9999".to_string(),
    });
    assert!(test
        .native
        .calls()
        .contains(&NativeCall::AtResponseCode(peer(), AtResponse::Error, 0)));
    assert!(dialled_numbers(&test.service.events()).is_empty());
}

#[test]
fn test_redial_without_history_errors() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.drain_records();

    test.stack(StackEventData::DialCall { number: String::new() });
    assert!(test
        .native
        .calls()
        .contains(&NativeCall::AtResponseCode(peer(), AtResponse::Error, 0)));
    assert!(!test.machine.snapshot().dialing_out);
}

#[test]
fn test_dialing_out_timeout_errors() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.stack(StackEventData::DialCall {
        number: "0611111".to_string(),
    });
    test.drain_records();

    test.machine.fire_timer(TimerKind::DialingOutTimeout);
    assert!(!test.machine.snapshot().dialing_out);
    assert!(test
        .native
        .calls()
        .contains(&NativeCall::AtResponseCode(peer(), AtResponse::Error, 0)));
}

#[test]
fn test_dial_terminates_virtual_call() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.send(AgMsg::VirtualCallStart(peer()));
    assert!(test.machine.snapshot().virtual_call_started);
    test.drain_records();

    test.stack(StackEventData::DialCall {
        number: "0611111".to_string(),
    });
    assert!(!test.machine.snapshot().virtual_call_started);
    assert_eq!(dialled_numbers(&test.service.events()), vec!["0611111".to_string()]);
}

#[test]
fn test_key_pressed_answers_when_ringing() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.system.set_telephony(|telephony| telephony.ringing = true);
    test.drain_records();

    test.stack(StackEventData::KeyPressed);
    assert!(test.system.calls().contains(&SystemCall::AnswerCall(peer())));
}

#[test]
fn test_key_pressed_claims_call_without_audio() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.system.set_telephony(|telephony| telephony.in_call = true);
    test.drain_records();

    test.stack(StackEventData::KeyPressed);
    assert_eq!(test.service.active_device_now(), Some(peer()));
    assert!(!test.system.calls().contains(&SystemCall::HangupCall(peer())));
}

#[test]
fn test_key_pressed_hangs_up_with_audio() {
    let mut test = MachineTest::new();
    test.to_audio_on();
    test.drain_records();

    test.stack(StackEventData::KeyPressed);
    assert!(test.system.calls().contains(&SystemCall::HangupCall(peer())));
}

#[test]
fn test_key_pressed_redials_when_idle() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.phonebook.set_last_dialled(Some("0655555"));
    test.drain_records();

    test.stack(StackEventData::KeyPressed);
    assert_eq!(dialled_numbers(&test.service.events()), vec!["0655555".to_string()]);
    assert!(test.machine.snapshot().dialing_out);
}

#[test]
fn test_hangup_during_virtual_call_stays_local() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.send(AgMsg::VirtualCallStart(peer()));
    test.drain_records();

    test.stack(StackEventData::HangupCall);
    assert!(!test.machine.snapshot().virtual_call_started);
    assert!(!test.system.calls().contains(&SystemCall::HangupCall(peer())));
}

#[test]
fn test_hangup_real_call_delegated() {
    let mut test = MachineTest::new();
    test.to_connected();
    test.drain_records();

    test.stack(StackEventData::HangupCall);
    assert!(test.system.calls().contains(&SystemCall::HangupCall(peer())));
}
