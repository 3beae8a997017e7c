//! Static shell files written into every site build.
//!
//! The page is a thin viewer over `content.json`: all heavy lifting
//! (style assignment, brightness analysis) happened at build time, so the
//! script only fetches, renders, and rotates.

pub(crate) const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Inspiration</title>
  <link rel="stylesheet" href="style.css">
</head>
<body>
  <main id="stage">
    <figure id="artwork">
      <img id="artwork-image" alt="">
    </figure>
    <section id="text">
      <blockquote id="body"></blockquote>
      <p id="attribution"></p>
    </section>
  </main>
  <script src="script.js"></script>
</body>
</html>
"#;

pub(crate) const STYLE_CSS: &str = r#"* { margin: 0; padding: 0; box-sizing: border-box; }

body {
  font-family: Georgia, 'Times New Roman', serif;
  min-height: 100vh;
  display: flex;
  align-items: center;
  justify-content: center;
  transition: background-color 1s ease, color 1s ease;
}

#stage {
  display: flex;
  flex-wrap: wrap;
  align-items: center;
  justify-content: center;
  gap: 3rem;
  padding: 2rem;
  max-width: 72rem;
}

#artwork img {
  max-width: min(32rem, 90vw);
  border-radius: 4px;
  box-shadow: 0 8px 32px rgba(0, 0, 0, 0.35);
}

#text { max-width: 28rem; }

#body {
  font-size: 1.5rem;
  line-height: 1.5;
  white-space: pre-wrap;
}

#attribution {
  margin-top: 1.5rem;
  font-style: italic;
  opacity: 0.8;
}

#attribution a { color: inherit; }
"#;

pub(crate) const SCRIPT_JS: &str = r#"(async function () {
  const response = await fetch('content.json');
  const entries = await response.json();
  if (!entries.length) return;

  const img = document.getElementById('artwork-image');
  const body = document.getElementById('body');
  const attribution = document.getElementById('attribution');

  function show(entry) {
    const image = entry.images[Math.floor(Math.random() * entry.images.length)];
    img.src = image ? image.path : '';
    img.alt = entry.title;
    body.textContent = entry.body;
    attribution.textContent = '— ' + entry.author;

    // Colors were computed at build time from the image itself.
    const colors = entry.brightness_analysis;
    document.body.style.backgroundColor = colors.background_color;
    document.body.style.color = colors.text_color;
    attribution.style.color = colors.accent_color;
  }

  let index = Math.floor(Math.random() * entries.length);
  show(entries[index]);
  setInterval(function () {
    index = (index + 1) % entries.length;
    show(entries[index]);
  }, 30000);
})();
"#;
