use std::{
  alloc::{GlobalAlloc, Layout},
  io::Read,
};

use fitalloc::SbrkAlloc;
use tracing_subscriber::EnvFilter;

// Every Rust allocation in this process, the demo's own included, is served
// from the program break by the best-fit heap.
#[global_allocator]
static ALLOCATOR: SbrkAlloc = unsafe { SbrkAlloc::new() };

/// Waits until the user presses ENTER when running with `--step`.
/// Useful when you want to inspect memory state with tools like `pmap`
/// or `gdb` between stages.
fn block_until_enter_pressed(step: bool) {
  if !step {
    return;
  }
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_heap_bounds() {
  let bounds = ALLOCATOR.heap_bounds();
  println!("Heap starts at: {:?}", bounds.start);
  println!("Heap ends at: {:?}", bounds.end);
}

fn bytes(size: usize) -> Layout {
  Layout::from_size_align(size, 1).expect("byte layouts are always valid")
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let step = std::env::args().any(|arg| arg == "--step");

  print_heap_bounds();
  block_until_enter_pressed(step);

  // Whatever the runtime and the subscriber hold so far is not ours.
  let baseline = ALLOCATOR.outstanding_bytes();

  // --------------------------------------------------------------------
  // 1) Five blocks of increasing size, appended one after another.
  // 2) Free the 200- and 400-byte blocks, leaving two holes.
  // 3) 150 bytes fit both holes; best fit takes the smaller one.
  //
  // Nothing is printed in between: printing allocates too, and could land
  // in one of the holes first.
  // --------------------------------------------------------------------
  let sizes = [100, 200, 300, 400, 500];
  let mut blocks = [std::ptr::null_mut::<u8>(); 5];
  for (slot, &size) in blocks.iter_mut().zip(&sizes) {
    *slot = unsafe { ALLOCATOR.alloc(bytes(size)) };
  }
  if blocks.iter().any(|ptr| ptr.is_null()) {
    eprintln!("the program break refused to grow");
    return;
  }

  let (p2, p4) = (blocks[1], blocks[3]);
  unsafe {
    ALLOCATOR.dealloc(p2, bytes(200));
    ALLOCATOR.dealloc(p4, bytes(400));
  }

  let p6 = unsafe { ALLOCATOR.alloc(bytes(150)) };

  for (ptr, size) in blocks.iter().zip(sizes) {
    println!("Allocated {} bytes at {:?}", size, ptr);
  }
  block_until_enter_pressed(step);

  println!("Freed 200-byte block at {:?}", p2);
  println!("Freed 400-byte block at {:?}", p4);
  block_until_enter_pressed(step);

  println!("Allocated 150 bytes at {:?}", p6);
  println!(
    "p6 == p2? {}",
    if p6 == p2 {
      "Yes, it reused the 200-byte hole"
    } else {
      "No, it went somewhere else"
    }
  );
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 4) Grow the first block; its payload moves and the old slot frees up.
  // --------------------------------------------------------------------
  let p1 = blocks[0];
  unsafe { p1.write_bytes(0x42, 100) };
  let moved = unsafe { ALLOCATOR.realloc(p1, bytes(100), 1000) };
  if moved.is_null() {
    eprintln!("resize failed");
  } else {
    println!("Resized 100 -> 1000 bytes: {:?} -> {:?}", p1, moved);
    println!("First byte after move = 0x{:X}", unsafe { moved.read() });
  }

  print_heap_bounds();
  println!(
    "Memory leaks: {} bytes",
    ALLOCATOR.outstanding_bytes().saturating_sub(baseline)
  );

  // The process exits and the OS reclaims the whole heap.
}
