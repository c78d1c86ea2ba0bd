//! End-to-end tests of the RADIUS backend against an in-process UDP responder

use authgw::{
    AuthError, AuthProvider, AvailabilityRegistry, Config, CredentialRequest, Gateway,
    HealthMonitor, ServerList, build_provider,
};
use authgw_radius::attributes::{MsAttributeType, VendorSpecific};
use authgw_radius::auth::encode_response;
use authgw_radius::message_auth::verify_message_authenticator;
use authgw_radius::{
    Attribute, AttributeType, Code, MsChap2Response, Packet, decrypt_user_password,
    verify_nt_response,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

const SECRET: &str = "testing123";
const USER: &str = "alice";
const PASSWORD: &str = "alice-pw";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Answer every request
    Answer,
    /// Never answer
    Silent,
    /// Send a reply with the wrong identifier before the real one
    WrongIdFirst,
    /// Sign replies with a different secret
    WrongSecret,
}

struct Responder {
    addr: SocketAddr,
    received: Arc<AtomicUsize>,
}

/// Check the credentials in a decoded Access-Request the way a RADIUS server would
fn credentials_valid(packet: &Packet) -> bool {
    let username = match packet.find_attribute(AttributeType::UserName as u8) {
        Some(attr) => attr.as_string().unwrap_or_default(),
        None => return false,
    };
    if username != USER {
        return false;
    }

    if let Some(hidden) = packet.find_attribute(AttributeType::UserPassword as u8) {
        return decrypt_user_password(&hidden.value, SECRET.as_bytes(), &packet.authenticator)
            .map(|password| password == PASSWORD)
            .unwrap_or(false);
    }

    let mut challenge = None;
    let mut response = None;
    for attr in packet.find_all_attributes(AttributeType::VendorSpecific as u8) {
        let Ok(vsa) = VendorSpecific::from_attribute(attr) else {
            continue;
        };
        if vsa.is_microsoft(MsAttributeType::ChapChallenge) && vsa.value.len() == 16 {
            let mut value = [0u8; 16];
            value.copy_from_slice(&vsa.value);
            challenge = Some(value);
        } else if vsa.is_microsoft(MsAttributeType::Chap2Response) {
            response = MsChap2Response::from_bytes(&vsa.value).ok();
        }
    }

    match (challenge, response) {
        (Some(challenge), Some(response)) => {
            verify_nt_response(&challenge, &response, &username, PASSWORD)
        }
        _ => false,
    }
}

async fn start_responder(mode: Mode) -> Responder {
    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind responder");
    let addr = socket.local_addr().expect("Failed to get responder address");
    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);

    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            if mode == Mode::Silent {
                continue;
            }

            let Ok(request) = Packet::decode(&buf[..len]) else {
                continue;
            };

            // Signed requests must verify
            if let Some(offset) =
                request.attribute_value_offset(AttributeType::MessageAuthenticator as u8)
                && !verify_message_authenticator(&buf[..len], SECRET.as_bytes(), offset)
            {
                continue;
            }

            let mut reply = if credentials_valid(&request) {
                let mut accept = Packet::new(Code::AccessAccept, request.identifier, [0u8; 16]);
                accept.add_attribute(
                    Attribute::ipv4(AttributeType::FramedIpAddress as u8, Ipv4Addr::new(10, 8, 0, 2))
                        .unwrap(),
                );
                accept.add_attribute(
                    Attribute::ipv4(
                        AttributeType::FramedIpNetmask as u8,
                        Ipv4Addr::new(255, 255, 255, 0),
                    )
                    .unwrap(),
                );
                accept
            } else {
                let mut reject = Packet::new(Code::AccessReject, request.identifier, [0u8; 16]);
                reject.add_attribute(
                    Attribute::string(AttributeType::ReplyMessage as u8, "bad password").unwrap(),
                );
                reject
            };

            if mode == Mode::WrongIdFirst {
                let mut stray = reply.clone();
                stray.identifier = request.identifier.wrapping_add(1);
                let bytes = encode_response(&stray, &request.authenticator, SECRET.as_bytes())
                    .unwrap();
                let _ = socket.send_to(&bytes, peer).await;
            }

            let secret = if mode == Mode::WrongSecret {
                b"not-the-secret".as_slice()
            } else {
                SECRET.as_bytes()
            };
            reply.identifier = request.identifier;
            let bytes = encode_response(&reply, &request.authenticator, secret).unwrap();
            let _ = socket.send_to(&bytes, peer).await;
        }
    });

    Responder { addr, received }
}

fn radius_config(servers: &[(SocketAddr, &str)], health_check: bool) -> Config {
    let servers: Vec<String> = servers
        .iter()
        .enumerate()
        .map(|(i, (addr, protocol))| {
            format!(
                r#"{{ "name": "r{}", "address": "{}", "port": {}, "secret": "{}",
                     "protocol": "{}", "response_timeout_sec": 1 }}"#,
                i,
                addr.ip(),
                addr.port(),
                SECRET,
                protocol
            )
        })
        .collect();

    let json = format!(
        r#"{{ "auth_provider": {{ "type": "radius",
              "radius": {{ "nas_id": "authgw-test", "nas_ipv4_address": "127.0.0.1",
                           "servers": [ {} ] }},
              "auth_check": {{ "enable": {}, "interval_sec": 60, "user": "{}", "pass": "{}" }} }} }}"#,
        servers.join(","),
        health_check,
        USER,
        PASSWORD
    );
    Config::from_json(&json).expect("Invalid test configuration")
}

fn provider_for(config: &Config) -> (Arc<dyn AuthProvider>, ServerList) {
    let servers = config.server_descriptors().unwrap();
    let provider = build_provider(config, Arc::clone(&servers)).unwrap();
    (provider, servers)
}

fn request(password: &str) -> CredentialRequest {
    CredentialRequest::new(USER, password, "192.0.2.44".parse().ok())
}

#[tokio::test]
async fn test_pap_accept_returns_network_data() {
    let responder = start_responder(Mode::Answer).await;
    let config = radius_config(&[(responder.addr, "pap")], false);
    let (provider, _) = provider_for(&config);

    let network = provider
        .authenticate_for_request(&request(PASSWORD), 0)
        .await
        .expect("Authentication should succeed");

    assert_eq!(network.ip, "10.8.0.2");
    assert_eq!(network.netmask, "255.255.255.0");
}

#[tokio::test]
async fn test_mschapv2_accept() {
    let responder = start_responder(Mode::Answer).await;
    let config = radius_config(&[(responder.addr, "mschapv2")], false);
    let (provider, _) = provider_for(&config);

    let result = provider.authenticate_for_request(&request(PASSWORD), 0).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_reject_is_protocol_rejection() {
    let responder = start_responder(Mode::Answer).await;
    let config = radius_config(&[(responder.addr, "mschapv2")], false);
    let (provider, _) = provider_for(&config);

    let result = provider.authenticate_for_request(&request("wrong"), 0).await;
    match result {
        Err(AuthError::Rejected(detail)) => assert!(detail.contains("bad password")),
        other => panic!("expected rejection, got {:?}", other),
    }

    let healthy = provider
        .authenticate_for_healthcheck(USER, "wrong", 0)
        .await
        .expect("A reject is an answer, not a transport failure");
    assert!(!healthy);
}

#[tokio::test]
async fn test_silent_server_is_transport_failure() {
    let responder = start_responder(Mode::Silent).await;
    let config = radius_config(&[(responder.addr, "pap")], false);
    let (provider, _) = provider_for(&config);

    let result = provider.authenticate_for_request(&request(PASSWORD), 0).await;
    assert!(matches!(result, Err(AuthError::Transport(_))));
    assert!(responder.received.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_stray_reply_is_ignored() {
    let responder = start_responder(Mode::WrongIdFirst).await;
    let config = radius_config(&[(responder.addr, "pap")], false);
    let (provider, _) = provider_for(&config);

    let result = provider.authenticate_for_request(&request(PASSWORD), 0).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_forged_reply_never_accepted() {
    let responder = start_responder(Mode::WrongSecret).await;
    let config = radius_config(&[(responder.addr, "pap")], false);
    let (provider, _) = provider_for(&config);

    let result = provider.authenticate_for_request(&request(PASSWORD), 0).await;
    assert!(matches!(result, Err(AuthError::Transport(_))));
}

#[tokio::test]
async fn test_unknown_ordinal() {
    let responder = start_responder(Mode::Answer).await;
    let config = radius_config(&[(responder.addr, "pap")], false);
    let (provider, _) = provider_for(&config);

    let result = provider.authenticate_for_healthcheck(USER, PASSWORD, 5).await;
    assert!(matches!(result, Err(AuthError::UnknownServer(5))));
}

#[tokio::test]
async fn test_health_cycle_against_live_servers() {
    let up_a = start_responder(Mode::Answer).await;
    let down = start_responder(Mode::Silent).await;
    let up_b = start_responder(Mode::Answer).await;
    let config = radius_config(
        &[(up_a.addr, "pap"), (down.addr, "mschapv2"), (up_b.addr, "mschapv2")],
        true,
    );
    let (provider, servers) = provider_for(&config);
    let registry = Arc::new(AvailabilityRegistry::new(servers.len()));

    let monitor = HealthMonitor::new(
        provider,
        Arc::clone(&registry),
        servers,
        &config.auth_provider.auth_check,
    );
    let snapshot = monitor.run_cycle().await;

    assert_eq!(snapshot.available(), &[0, 2]);
    assert_eq!(snapshot.unavailable(), &[1]);
}

#[tokio::test]
async fn test_gateway_fails_over_after_health_check() {
    let down = start_responder(Mode::Silent).await;
    let up = start_responder(Mode::Answer).await;
    let config = radius_config(&[(down.addr, "pap"), (up.addr, "pap")], true);

    let token = CancellationToken::new();
    let (gateway, monitor) = Gateway::launch(&config, token.clone()).unwrap();
    let monitor = monitor.expect("Health checks are enabled");

    // Wait for the first cycle; the silent server takes its full timeout
    for _ in 0..50 {
        if gateway.registry().snapshot().generation() > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    assert_eq!(gateway.registry().current_available(), vec![1]);

    let outcome = gateway.check(USER, PASSWORD, "192.0.2.44".parse().ok()).await;
    assert!(outcome.success);
    assert_eq!(outcome.network.unwrap().ip, "10.8.0.2");
    assert!(down.received.load(Ordering::SeqCst) >= 1);

    token.cancel();
    monitor.await.unwrap();
}
