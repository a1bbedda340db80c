//! Load test for the minigolf server.
//!
//! Spawns multiple fake TCP clients that:
//! - Connect to the server and wait for their session id
//! - Periodically shoot their ball in a random direction, or respawn it if
//!   it is still rolling
//! - Ping once a second and measure the PONG round trip
//! - Receive and count snapshot broadcasts
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 50)
//!   --duration S     Test duration in seconds (default: 30)
//!   --shoot-rate R   Shots per second per client (default: 0.5)
//!   --addr ADDR      Server address (default: 127.0.0.1:8888)
//!   --seed N         Seed for the aim generator (default: 42)

use minigolf_shared::client::{Client, ClientError};
use minigolf_shared::protocol::{ClientMsg, ServerMsg, ShootContent};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    snapshots_received: AtomicU64,
    shots_sent: AtomicU64,
    respawns_sent: AtomicU64,
    pongs_received: AtomicU64,
    errors: AtomicU64,
    total_balls_seen: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
    rtt_sum_us: AtomicU64,
}

// === Client task ===

async fn run_client(
    client_id: u32,
    addr: String,
    shoot_rate: f64,
    duration: Duration,
    seed: u64,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();

    // Connecting includes waiting for our session id
    let connected = tokio::time::timeout(Duration::from_secs(5), Client::connect(addr.as_str())).await;
    let client = match connected {
        Ok(Ok(client)) => client,
        Ok(Err(e)) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
        Err(_) => {
            if client_id < 3 {
                eprintln!("Client {} never got a session id", client_id);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    let (my_id, mut reader, mut writer) = client.into_split();
    metrics.messages_received.fetch_add(1, Ordering::Relaxed);

    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);
    if client_id < 3 {
        eprintln!("Client {} is {}", client_id, my_id);
    }

    let shoot_interval = if shoot_rate > 0.0 {
        Duration::from_secs_f64(1.0 / shoot_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut shoot_timer = tokio::time::interval(shoot_interval);
    shoot_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ping_timer = tokio::time::interval(Duration::from_secs(1));
    ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(client_id as u64));
    let mut ball_resting = true;
    let mut ping_sent: Option<Instant> = None;
    let test_end = Instant::now() + duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = shoot_timer.tick() => {
                let ok = if ball_resting {
                    let angle = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
                    let power = rng.gen_range(0.2..1.0);
                    let msg = ClientMsg::Shoot(ShootContent {
                        vector: [angle.cos() * power, angle.sin() * power],
                    });
                    metrics.shots_sent.fetch_add(1, Ordering::Relaxed);
                    // Assume moving until a snapshot says otherwise
                    ball_resting = false;
                    writer.send(&msg).await.is_ok()
                } else {
                    metrics.respawns_sent.fetch_add(1, Ordering::Relaxed);
                    writer.send(&ClientMsg::Respawn).await.is_ok()
                };
                if !ok {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            _ = ping_timer.tick() => {
                if ping_sent.is_none() {
                    ping_sent = Some(Instant::now());
                    if writer.send(&ClientMsg::Ping).await.is_err() {
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                }
            }

            msg = reader.recv() => {
                match msg {
                    Ok(Some(msg)) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match msg {
                            ServerMsg::Snapshot(snap) => {
                                metrics.snapshots_received.fetch_add(1, Ordering::Relaxed);
                                metrics.total_balls_seen.fetch_add(snap.balls.len() as u64, Ordering::Relaxed);
                                if let Some(mine) = snap.balls.iter().find(|b| b.id == my_id) {
                                    ball_resting = mine.vel == [0.0, 0.0];
                                }
                            }
                            ServerMsg::Pong(_) => {
                                metrics.pongs_received.fetch_add(1, Ordering::Relaxed);
                                if let Some(sent) = ping_sent.take() {
                                    metrics.rtt_sum_us.fetch_add(sent.elapsed().as_micros() as u64, Ordering::Relaxed);
                                }
                            }
                            _ => {}
                        }
                    }
                    Ok(None) => {
                        if client_id < 3 {
                            eprintln!("Client {} stream ended", client_id);
                        }
                        break;
                    }
                    Err(ClientError::Io(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    // One bad message; keep reading
                    Err(_) => {
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }

    let _ = writer.shutdown().await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 50;
    let mut duration_secs: u64 = 30;
    let mut shoot_rate: f64 = 0.5;
    let mut addr = "127.0.0.1:8888".to_string();
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(50);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--shoot-rate" => {
                i += 1;
                shoot_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(0.5);
            }
            "--addr" => {
                i += 1;
                addr = args.get(i).cloned().unwrap_or(addr);
            }
            "--seed" => {
                i += 1;
                seed = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(42);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Minigolf Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Shoot rate: {}/s per client", shoot_rate);
    println!("Address: {}", addr);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);
    println!("Spawning {} clients...", num_clients);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let addr = addr.clone();
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(run_client(
            client_id, addr, shoot_rate, duration, seed, metrics,
        )));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            let m = &metrics_clone;
            println!(
                "[{:3}s] connected={}, msgs={}, snapshots={}, shots={}, respawns={}, pongs={}, errors={}",
                elapsed,
                m.connected.load(Ordering::Relaxed),
                m.messages_received.load(Ordering::Relaxed),
                m.snapshots_received.load(Ordering::Relaxed),
                m.shots_sent.load(Ordering::Relaxed),
                m.respawns_sent.load(Ordering::Relaxed),
                m.pongs_received.load(Ordering::Relaxed),
                m.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let snapshots = metrics.snapshots_received.load(Ordering::Relaxed);
    let balls = metrics.total_balls_seen.load(Ordering::Relaxed);
    let pongs = metrics.pongs_received.load(Ordering::Relaxed);
    let rtt_sum = metrics.rtt_sum_us.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total snapshots: {}", snapshots);
    println!("Total shots sent: {}", metrics.shots_sent.load(Ordering::Relaxed));
    println!("Total respawns sent: {}", metrics.respawns_sent.load(Ordering::Relaxed));
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    println!(
        "Average balls per snapshot: {}",
        if snapshots > 0 { balls / snapshots } else { 0 }
    );
    if latency_count > 0 {
        println!("Average time to session id: {}ms", latency_sum / latency_count);
    }
    if pongs > 0 {
        println!("Average PING round trip: {}us", rtt_sum / pongs);
    }

    let snapshots_per_client = snapshots as f64 / num_clients.max(1) as f64;
    println!();
    println!("Messages/sec (total): {:.0}", msgs as f64 / duration_secs.max(1) as f64);
    println!("Snapshots per client: {:.1}", snapshots_per_client);
    println!(
        "Expected snapshots per client: {:.1}",
        duration_secs as f64 * 30.0
    ); // 30 Hz broadcast by default

    let delivery_rate = snapshots_per_client / (duration_secs.max(1) as f64 * 30.0) * 100.0;
    println!("Delivery rate: {:.1}%", delivery_rate);
}
