use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use wakebot::{CommandHandler, MagicPacket, MacAddress, Registry, RegistryConfig, WakePacketSender, WolConfig};

async fn setup(dir: &std::path::Path) -> (UdpSocket, CommandHandler) {
    let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let sender = WakePacketSender::new(WolConfig {
        broadcast_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: listener.local_addr().unwrap().port(),
        send_timeout: Duration::from_secs(1),
    });
    let registry = Arc::new(Registry::new(RegistryConfig {
        data_dir: dir.to_owned(),
        ..Default::default()
    }));
    (listener, CommandHandler::new("%", registry, sender))
}

#[tokio::test]
async fn testmac_reports_validity() {
    let dir = tempfile::tempdir().unwrap();
    let (_l, bot) = setup(dir.path()).await;

    assert_eq!(
        bot.handle("1", "%testmac aa-bb-cc-dd-ee-ff").await.as_deref(),
        Some("MAC address `AA:BB:CC:DD:EE:FF` is valid!")
    );
    assert_eq!(
        bot.handle("1", "%testmac aa:bb:cc:dd:ee").await.as_deref(),
        Some("MAC address `AA:BB:CC:DD:EE` is not valid.")
    );
}

#[tokio::test]
async fn add_get_delete_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let (_l, bot) = setup(dir.path()).await;

    assert_eq!(
        bot.handle("42", "%addmac nas aa:bb:cc:dd:ee:ff").await.as_deref(),
        Some("MAC address `AA:BB:CC:DD:EE:FF` added for `nas`.")
    );
    assert_eq!(
        bot.handle("42", "%getmac nas").await.as_deref(),
        Some("MAC address for `nas` is `AA:BB:CC:DD:EE:FF`.")
    );
    assert_eq!(
        bot.handle("7", "%getmac nas").await.as_deref(),
        Some("No MAC exists for `nas`.")
    );
    assert_eq!(
        bot.handle("42", "%delmac nas").await.as_deref(),
        Some("MAC address for `nas` is deleted.")
    );
    assert_eq!(
        bot.handle("42", "%getmac nas").await.as_deref(),
        Some("No MAC exists for `nas`.")
    );
    assert!(dir.path().join("42-macs.json").exists());
}

#[tokio::test]
async fn addmac_rejects_invalid_address() {
    let dir = tempfile::tempdir().unwrap();
    let (_l, bot) = setup(dir.path()).await;

    assert_eq!(
        bot.handle("42", "%addmac nas aa:bb:cc:dd:ee:gg").await.as_deref(),
        Some("MAC address `AA:BB:CC:DD:EE:GG` is not valid.")
    );
    assert!(!dir.path().join("42-macs.json").exists());
}

#[tokio::test]
async fn wakemac_broadcasts_magic_packet() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, bot) = setup(dir.path()).await;

    bot.handle("42", "%addmac \"gaming pc\" 01-02-03-04-05-06").await.unwrap();
    assert_eq!(
        bot.handle("42", "%wakemac \"gaming pc\"").await.as_deref(),
        Some("Waking up host `01:02:03:04:05:06`...")
    );

    let mut buf = [0u8; 256];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), listener.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(MagicPacket::parse(&buf[..n]), Some(MacAddress::new([1, 2, 3, 4, 5, 6])));
}

#[tokio::test]
async fn wakemac_reports_send_failure() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(Registry::new(RegistryConfig {
        data_dir: dir.path().to_owned(),
        ..Default::default()
    }));
    let unroutable = WakePacketSender::new(WolConfig {
        broadcast_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        send_timeout: Duration::from_secs(1),
    });
    let bot = CommandHandler::new("%", registry, unroutable);

    bot.handle("42", "%addmac h 01:02:03:04:05:06").await.unwrap();
    assert_eq!(
        bot.handle("42", "%wakemac h").await.as_deref(),
        Some("Could not send the wake packet.")
    );
}

#[tokio::test]
async fn wakemac_unknown_name_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, bot) = setup(dir.path()).await;

    assert_eq!(
        bot.handle("42", "%wakemac ghost").await.as_deref(),
        Some("No MAC exists for `ghost`.")
    );

    let mut buf = [0u8; 256];
    let waited = tokio::time::timeout(Duration::from_millis(200), listener.recv_from(&mut buf)).await;
    assert!(waited.is_err());
}

#[tokio::test]
async fn listmacs_is_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let (_l, bot) = setup(dir.path()).await;

    assert_eq!(bot.handle("1", "%listmacs").await.as_deref(), Some("No MAC addresses registered."));

    bot.handle("1", "%addmac zeta 00:00:00:00:00:02").await.unwrap();
    bot.handle("1", "%addmac alpha 00:00:00:00:00:01").await.unwrap();
    assert_eq!(
        bot.handle("1", "%LISTMACS").await.as_deref(),
        Some("`alpha`: `00:00:00:00:00:01`\n`zeta`: `00:00:00:00:00:02`")
    );
}

#[tokio::test]
async fn silent_on_chatter_and_unknown_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (_l, bot) = setup(dir.path()).await;

    assert_eq!(bot.handle("1", "good morning").await, None);
    assert_eq!(bot.handle("1", "%dance").await, None);
}

#[tokio::test]
async fn wrong_arity_explains_quoting() {
    let dir = tempfile::tempdir().unwrap();
    let (_l, bot) = setup(dir.path()).await;

    let reply = bot.handle("1", "%addmac my pc 00:11:22:33:44:55").await.unwrap();
    assert!(reply.starts_with("Error: usage: addmac <name> <mac>"), "{}", reply);
    assert!(reply.ends_with("make sure to surround it with quotes."));
}

#[tokio::test]
async fn corrupt_store_gives_failure_reply() {
    let dir = tempfile::tempdir().unwrap();
    let (_l, bot) = setup(dir.path()).await;
    std::fs::write(dir.path().join("1-macs.json"), "{").unwrap();

    assert_eq!(
        bot.handle("1", "%getmac nas").await.as_deref(),
        Some("Could not access the MAC address store.")
    );
}
